//! Walks - Whole-closure traversals from a set of roots
//!
//! Unlike a [`GraphDumper`] recursion, these walks remember every object they
//! have visited, so each reachable object is produced exactly once no matter
//! how many paths lead to it. The seen set costs one hash entry per
//! reachable object.
//!
//! Pending objects are kept on a stack: the last root is visited first, and
//! the referents of an object are visited last-to-first.

use crate::dumper::{GraphDumper, RecursionMode};
use crate::error::Result;
use crate::filter::ExclusionFilter;
use crate::logging::{self, DumpEvent};
use crate::object::{referents, ObjectHandle, ObjectModel};
use crate::size::SizeEstimator;
use crate::writer::DumpSink;
use rustc_hash::FxHashSet;

/// Iterator over every object reachable from a set of roots
pub struct Reachable<'m> {
    model: &'m dyn ObjectModel,
    pending: Vec<ObjectHandle>,
    seen: FxHashSet<ObjectHandle>,
}

impl<'m> Reachable<'m> {
    pub fn new(model: &'m dyn ObjectModel, roots: &[ObjectHandle]) -> Self {
        Self {
            model,
            pending: roots.to_vec(),
            seen: FxHashSet::default(),
        }
    }

    /// Objects produced so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

impl Iterator for Reachable<'_> {
    type Item = ObjectHandle;

    fn next(&mut self) -> Option<ObjectHandle> {
        while let Some(obj) = self.pending.pop() {
            if !self.seen.insert(obj) {
                continue;
            }
            for child in referents(self.model, obj) {
                if !self.seen.contains(&child) {
                    self.pending.push(child);
                }
            }
            return Some(obj);
        }
        None
    }
}

/// Dump every object reachable from `roots` exactly once
///
/// Objects are written without recursion and without an exclusion filter.
/// Returns the number of records written.
pub fn dump_all_referenced<S: DumpSink + ?Sized>(
    dumper: &mut GraphDumper<'_>,
    sink: &mut S,
    roots: &[ObjectHandle],
) -> Result<u64> {
    let before = dumper.stats().clone();
    let walk = Reachable::new(dumper.model(), roots);
    dumper.dump_many(sink, walk, &ExclusionFilter::None, RecursionMode::None)?;

    let records = dumper.stats().records_emitted - before.records_emitted;
    if dumper.config().verbose {
        logging::log_event(DumpEvent::WalkSummary {
            walk: "dump_all_referenced".to_string(),
            objects: records as usize,
            total_size: dumper.stats().total_size - before.total_size,
        });
    }
    Ok(records)
}

/// Number of objects reachable from `roots` and their total estimated size
pub fn recursive_size(estimator: &SizeEstimator<'_>, model: &dyn ObjectModel, roots: &[ObjectHandle]) -> (usize, u64) {
    let mut walk = Reachable::new(model, roots);
    let total = walk
        .by_ref()
        .map(|obj| estimator.estimate(obj) as u64)
        .sum();
    (walk.seen_count(), total)
}

/// Every object reachable from `roots`, each once, in visit order
pub fn recursive_items(model: &dyn ObjectModel, roots: &[ObjectHandle]) -> Vec<ObjectHandle> {
    Reachable::new(model, roots).collect()
}
