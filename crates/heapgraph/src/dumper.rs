//! Graph Dumper - One JSON record per object
//!
//! The dumper writes one newline-terminated JSON object per emitted heap
//! object:
//!
//! ```text
//! {"address": 268435520, "type": "list", "size": 88, "len": 3, "refs": [268435552, 268435568, 268435584]}
//! ```
//!
//! Fields are written in a fixed order: `address`, `type`, `size`, then the
//! optional `name`, `len` and `value`, then `refs`. Type names are capped at
//! the default string length; `max_string_len` only applies to names and
//! values.
//!
//! # Recursion
//!
//! ```text
//! None         emit the root only
//! Eager        emit the root, then every direct reference (one level)
//! IfUntracked  emit the root, then the references a tracked-objects walk
//!              cannot see: objects without a traversal hook and static
//!              type objects, plus (recursively) traversable objects that
//!              are not cycle-tracked
//! ```
//!
//! Traversal uses an explicit work stack. Emission order is depth-first
//! preorder: the root, then each referent in enumeration order.
//!
//! # Session state
//!
//! A [`GraphDumper`] owns the dedup slot and the escape scratch buffer, and
//! borrows the object model and the special-case registry. The dedup slot
//! survives between calls so a caller feeding a long object sequence
//! through several `dump` calls still suppresses adjacent repeats; call
//! [`reset`](GraphDumper::reset) between unrelated dumps.

use crate::config::{DumpConfig, DEFAULT_MAX_STRING_LEN};
use crate::dedup::DedupCache;
use crate::error::Result;
use crate::escape::EscapeBuffer;
use crate::filter::ExclusionFilter;
use crate::logging::{self, DumpEvent};
use crate::object::{self, ObjectHandle, ObjectKind, ObjectModel};
use crate::size::SizeEstimator;
use crate::special::SpecialCaseRegistry;
use crate::stats::DumpStats;
use crate::writer::{DumpSink, ReferenceWriter};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// How far a dump follows references from its root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecursionMode {
    /// Root only
    #[default]
    None,
    /// Root plus its direct references
    Eager,
    /// Root plus the references a tracked-objects walk would miss
    IfUntracked,
}

impl fmt::Display for RecursionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecursionMode::None => write!(f, "none"),
            RecursionMode::Eager => write!(f, "eager"),
            RecursionMode::IfUntracked => write!(f, "if_untracked"),
        }
    }
}

/// Dump session over one object model
///
/// # Examples
///
/// ```rust
/// use heapgraph::arena::Arena;
/// use heapgraph::{DumpConfig, ExclusionFilter, GraphDumper, RecursionMode, SpecialCaseRegistry};
///
/// let mut heap = Arena::new();
/// let one = heap.int(1);
/// let list = heap.list(&[one]);
///
/// let registry = SpecialCaseRegistry::new();
/// let mut dumper = GraphDumper::new(&heap, &registry, DumpConfig::default()).unwrap();
///
/// let mut out = Vec::new();
/// dumper
///     .dump(&mut out, list, &ExclusionFilter::None, RecursionMode::Eager)
///     .unwrap();
///
/// let text = String::from_utf8(out).unwrap();
/// assert_eq!(text.lines().count(), 2);
/// assert!(text.starts_with("{\"address\": "));
/// ```
pub struct GraphDumper<'a> {
    model: &'a dyn ObjectModel,
    estimator: SizeEstimator<'a>,
    config: DumpConfig,
    dedup: DedupCache,
    scratch: EscapeBuffer,
    stats: DumpStats,
    refs: Vec<ObjectHandle>,
}

impl<'a> GraphDumper<'a> {
    /// Create a dump session
    ///
    /// Fails when `config` does not validate.
    pub fn new(
        model: &'a dyn ObjectModel,
        specials: &'a SpecialCaseRegistry,
        config: DumpConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            model,
            estimator: SizeEstimator::new(model, specials, config.layout),
            scratch: EscapeBuffer::with_capacity(config.escape_buffer_size),
            config,
            dedup: DedupCache::new(),
            stats: DumpStats::new(),
            refs: Vec::new(),
        })
    }

    pub fn model(&self) -> &'a dyn ObjectModel {
        self.model
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    pub fn estimator(&self) -> &SizeEstimator<'a> {
        &self.estimator
    }

    /// Counters accumulated since creation or the last reset
    pub fn stats(&self) -> &DumpStats {
        &self.stats
    }

    /// Forget the last emitted object and zero the counters
    pub fn reset(&mut self) {
        self.dedup.clear();
        self.stats = DumpStats::new();
    }

    /// Estimated size of `obj`
    pub fn size_of(&self, obj: ObjectHandle) -> usize {
        self.estimator.estimate(obj)
    }

    /// Direct references of `obj` without sizing or emission
    pub fn referents(&self, obj: ObjectHandle) -> Vec<ObjectHandle> {
        object::referents(self.model, obj)
    }

    /// Dump `root` and, depending on `mode`, the objects it references
    ///
    /// A sink failure or an escape overflow ends the dump; records written
    /// before the failure stay written.
    pub fn dump<S: DumpSink + ?Sized>(
        &mut self,
        sink: &mut S,
        root: ObjectHandle,
        filter: &ExclusionFilter,
        mode: RecursionMode,
    ) -> Result<()> {
        self.dump_many(sink, std::iter::once(root), filter, mode)
    }

    /// Dump each object of `roots` in turn with the same filter and mode
    pub fn dump_many<S, I>(
        &mut self,
        sink: &mut S,
        roots: I,
        filter: &ExclusionFilter,
        mode: RecursionMode,
    ) -> Result<()>
    where
        S: DumpSink + ?Sized,
        I: IntoIterator<Item = ObjectHandle>,
    {
        let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let records_before = self.stats.records_emitted;

        if self.config.verbose {
            logging::log_event(DumpEvent::SessionStart {
                session,
                mode: mode.to_string(),
            });
        }

        let mut writer = ReferenceWriter::new(sink);
        let mut processed = 0usize;
        let mut result = Ok(());
        for root in roots {
            result = self.dump_from(&mut writer, root, filter, mode);
            if result.is_err() {
                break;
            }
            processed += 1;
        }
        self.stats.bytes_written += writer.bytes_written();

        if self.config.verbose {
            match &result {
                Ok(()) => {
                    if processed > 1 {
                        logging::log_event(DumpEvent::BatchProgress {
                            session,
                            objects: processed,
                        });
                    }
                    logging::log_event(DumpEvent::SessionEnd {
                        session,
                        roots: processed,
                        records: self.stats.records_emitted - records_before,
                        bytes_written: writer.bytes_written(),
                        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                    });
                }
                Err(err) => logging::log_event(DumpEvent::DumpFailed {
                    session,
                    error: err.to_string(),
                }),
            }
        }

        result
    }

    /// Work-stack walk from one root
    fn dump_from<S: DumpSink + ?Sized>(
        &mut self,
        writer: &mut ReferenceWriter<'_, S>,
        root: ObjectHandle,
        filter: &ExclusionFilter,
        mode: RecursionMode,
    ) -> Result<()> {
        let mut stack = vec![(root, mode)];

        while let Some((obj, mode)) = stack.pop() {
            if filter.excludes(self.model, obj) {
                log::trace!("skipping excluded object {}", obj);
                self.stats.skipped_excluded += 1;
                continue;
            }
            if self.dedup.should_skip(obj) {
                self.stats.skipped_duplicate += 1;
                continue;
            }
            self.dedup.record(obj);

            self.write_record(writer, obj)?;

            if mode == RecursionMode::None || self.refs.is_empty() {
                continue;
            }
            let first_child = stack.len();
            for &child in &self.refs {
                if let Some(child_mode) = self.child_mode(child, mode) {
                    stack.push((child, child_mode));
                }
            }
            // Pop order must match enumeration order
            stack[first_child..].reverse();
        }

        Ok(())
    }

    /// Mode a referent is dumped with, or `None` when it is not dumped
    fn child_mode(&self, child: ObjectHandle, parent: RecursionMode) -> Option<RecursionMode> {
        match parent {
            RecursionMode::None => None,
            RecursionMode::Eager => Some(RecursionMode::None),
            RecursionMode::IfUntracked => {
                if !object::traversal_permitted(self.model, child) {
                    Some(RecursionMode::None)
                } else if !self.model.is_cycle_tracked(child) {
                    Some(RecursionMode::IfUntracked)
                } else {
                    None
                }
            }
        }
    }

    /// Write one record; leaves the object's references in `self.refs`
    fn write_record<S: DumpSink + ?Sized>(
        &mut self,
        writer: &mut ReferenceWriter<'_, S>,
        obj: ObjectHandle,
    ) -> Result<()> {
        let model = self.model;
        let max_len = self.config.max_string_len;
        let size = self.estimator.estimate(obj);
        let kind = model.kind(obj);

        writer.write_static("{\"address\": ")?;
        writer.write_unsigned(obj.address() as u64)?;
        writer.write_static(", \"type\": ")?;
        writer.write_raw(
            self.scratch
                .escape_str(model.type_of(obj).name(), DEFAULT_MAX_STRING_LEN)?,
        )?;
        writer.write_static(", \"size\": ")?;
        writer.write_unsigned(size as u64)?;

        if matches!(
            kind,
            ObjectKind::Module | ObjectKind::Function | ObjectKind::Type | ObjectKind::Class
        ) {
            if let Some(name) = model.object_name(obj) {
                writer.write_static(", \"name\": ")?;
                writer.write_raw(self.scratch.escape_str(name, max_len)?)?;
            }
        }

        self.write_value(writer, obj, kind)?;

        self.refs.clear();
        if object::traversal_permitted(model, obj) {
            let refs = &mut self.refs;
            model.traverse(obj, &mut |r| refs.push(r));
        }

        writer.write_static(", \"refs\": [")?;
        for (i, r) in self.refs.iter().enumerate() {
            if i > 0 {
                writer.write_static(", ")?;
            }
            writer.write_unsigned(r.address() as u64)?;
        }
        writer.write_static("]}\n")?;

        self.stats.record(size, self.refs.len());
        Ok(())
    }

    /// `len` and `value` fields for the families that carry them
    fn write_value<S: DumpSink + ?Sized>(
        &mut self,
        writer: &mut ReferenceWriter<'_, S>,
        obj: ObjectHandle,
        kind: ObjectKind,
    ) -> Result<()> {
        let model = self.model;
        let max_len = self.config.max_string_len;

        match kind {
            ObjectKind::Bytes => {
                if let Some(bytes) = model.byte_content(obj) {
                    writer.write_static(", \"len\": ")?;
                    writer.write_unsigned(bytes.len() as u64)?;
                    writer.write_static(", \"value\": ")?;
                    writer.write_raw(self.scratch.escape_bytes(bytes, max_len)?)?;
                }
            }
            ObjectKind::Text => {
                if let Some(text) = model.text_units(obj) {
                    writer.write_static(", \"len\": ")?;
                    writer.write_unsigned(text.len() as u64)?;
                    writer.write_static(", \"value\": ")?;
                    writer.write_raw(self.scratch.escape_text(text, max_len)?)?;
                }
            }
            ObjectKind::Bool => match model.bool_singleton(obj) {
                Some(true) => writer.write_static(", \"value\": \"True\"")?,
                Some(false) => writer.write_static(", \"value\": \"False\"")?,
                None => {
                    if let Some(value) = model.int_value(obj) {
                        writer.write_static(", \"value\": ")?;
                        writer.write_signed(value)?;
                    }
                }
            },
            ObjectKind::Int => {
                if let Some(value) = model.int_value(obj) {
                    writer.write_static(", \"value\": ")?;
                    writer.write_signed(value)?;
                }
            }
            ObjectKind::Tuple | ObjectKind::List | ObjectKind::Set | ObjectKind::Dict => {
                if let Ok(len) = model.item_count(obj) {
                    writer.write_static(", \"len\": ")?;
                    writer.write_unsigned(len as u64)?;
                }
            }
            ObjectKind::Frame => {
                if let Some(code_name) = model.frame_code_name(obj) {
                    writer.write_static(", \"value\": ")?;
                    writer.write_raw(self.scratch.escape_str(code_name, max_len)?)?;
                }
            }
            _ => {}
        }

        Ok(())
    }
}
