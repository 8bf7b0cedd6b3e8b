//! # heapgraph - Heap Object-Graph Inspector
//!
//! heapgraph estimates the memory footprint of objects in a managed runtime
//! heap and writes their reference graph as newline-delimited JSON, one
//! record per object, for offline memory-usage analysis.
//!
//! ## Overview
//!
//! - **Size estimation**: layout-aware sizes for lists, hash tables and
//!   text, overridable per type name, with runtime self-reports as fallback
//! - **Reference dumps**: one JSON line per object with its address, type,
//!   size, optional name/length/value and outgoing references
//! - **Bounded recursion**: root only, one level, or "what a tracked-objects
//!   walk would miss"
//! - **Closure walks**: every reachable object exactly once
//!
//! The runtime is reached only through the [`ObjectModel`] trait. The
//! [`arena`] module ships an in-memory reference heap implementing it.
//!
//! ## Quick Start
//!
//! ```rust
//! use heapgraph::arena::Arena;
//! use heapgraph::{DumpConfig, ExclusionFilter, GraphDumper, RecursionMode, SpecialCaseRegistry};
//!
//! fn main() -> heapgraph::Result<()> {
//!     let mut heap = Arena::new();
//!     let key = heap.text("answer");
//!     let value = heap.int(42);
//!     let dict = heap.dict(&[(key, value)]);
//!
//!     let registry = SpecialCaseRegistry::new();
//!     let mut dumper = GraphDumper::new(&heap, &registry, DumpConfig::default())?;
//!
//!     let mut out = Vec::new();
//!     dumper.dump(&mut out, dict, &ExclusionFilter::None, RecursionMode::Eager)?;
//!
//!     // the dict, then its key and value
//!     assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   root ─▶ ExclusionFilter ─▶ DedupCache ─▶ SizeEstimator ─▶ record
//!                                                │              │
//!                                   SpecialCaseRegistry   StringEscaper
//!                                                               │
//!                                                        ReferenceWriter
//!                                                               │
//!   ObjectModel (runtime binding)                    DumpSink (file, closure)
//! ```
//!
//! ## Safety of the heap
//!
//! Handles are only meaningful while the inspected heap is quiescent. Stop
//! the collector and the mutators for the duration of a dump.
//!
//! ## Modules
//!
//! - [`arena`]: In-memory reference heap
//! - [`config`]: Dump configuration and runtime layout constants
//! - [`dedup`]: Immediate-repeat suppression
//! - [`dumper`]: Record emission and recursion
//! - [`error`]: Error types
//! - [`escape`]: Bounded JSON string escaping
//! - [`filter`]: Exclusion filter
//! - [`logging`]: Session events
//! - [`object`]: The runtime-facing object model
//! - [`size`]: Size estimation chain
//! - [`special`]: Per-type size overrides
//! - [`stats`]: Dump counters
//! - [`walk`]: Seen-set closure walks
//! - [`writer`]: Sinks and the counting writer

// Runtime-facing model
pub mod object;
pub mod arena;

// Core
pub mod config;
pub mod error;
pub mod size;
pub mod special;
pub mod escape;
pub mod writer;
pub mod dedup;
pub mod filter;
pub mod dumper;
pub mod walk;

// Monitoring
pub mod logging;
pub mod stats;

// Re-export main types for convenience
pub use config::{DumpConfig, LayoutConfig};
pub use dumper::{GraphDumper, RecursionMode};
pub use error::{DumpError, ModelError, Result};
pub use filter::ExclusionFilter;
pub use object::{ObjectHandle, ObjectKind, ObjectModel, TypeDescriptor};
pub use size::SizeEstimator;
pub use special::SpecialCaseRegistry;
pub use writer::{CallbackSink, DumpSink};

/// heapgraph version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Estimated size of `obj` using the process-wide registry
///
/// # Examples
///
/// ```rust
/// use heapgraph::arena::Arena;
///
/// let mut heap = Arena::new();
/// let text = heap.text("abc");
/// assert_eq!(heapgraph::size_of(&heap, text), 48 + 3 * 4);
/// ```
pub fn size_of(model: &dyn ObjectModel, obj: ObjectHandle) -> usize {
    let registry = special::global().read();
    SizeEstimator::new(model, &registry, LayoutConfig::default()).estimate(obj)
}

/// Direct references of `obj`
pub fn get_referents(model: &dyn ObjectModel, obj: ObjectHandle) -> Vec<ObjectHandle> {
    object::referents(model, obj)
}

/// One-shot dump of `obj` using the process-wide registry and `config`
///
/// Each call starts with an empty dedup slot. Use a [`GraphDumper`] to keep
/// it across calls.
pub fn dump_object_info<S: DumpSink + ?Sized>(
    sink: &mut S,
    model: &dyn ObjectModel,
    obj: ObjectHandle,
    filter: &ExclusionFilter,
    mode: RecursionMode,
    config: DumpConfig,
) -> Result<()> {
    let registry = special::global().read();
    let mut dumper = GraphDumper::new(model, &registry, config)?;
    dumper.dump(sink, obj, filter, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(DumpConfig::default().validate().is_ok());
    }

    #[test]
    fn test_dump_object_info_one_shot() {
        let mut heap = Arena::new();
        let a = heap.int(5);
        let mut out = Vec::new();
        dump_object_info(
            &mut out,
            &heap,
            a,
            &ExclusionFilter::None,
            RecursionMode::None,
            DumpConfig::default(),
        )
        .unwrap();
        let record: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(record["value"], 5);
        assert_eq!(record["size"], 24);
    }

    #[test]
    fn test_get_referents_of_leaf() {
        let mut heap = Arena::new();
        let a = heap.int(5);
        assert!(get_referents(&heap, a).is_empty());
    }
}
