//! Special-Case Size Registry
//!
//! Some types report no size, or a wrong one, because most of their memory
//! sits in buffers the runtime cannot see (compression streams, array
//! payloads). Callers register a size function per type name; the estimator
//! consults it before asking the object to report its own size.
//!
//! Returned sizes exclude the GC header. A negative result or an error means
//! "unknown" and the estimator falls through to the next strategy.
//!
//! # Example
//!
//! ```rust
//! use heapgraph::special::SpecialCaseRegistry;
//!
//! let mut registry = SpecialCaseRegistry::new();
//! registry.register("zlib.Compress", |_model, _obj| Ok(256 * 1024));
//! assert!(registry.get("zlib.Compress").is_some());
//! assert_eq!(registry.len(), 1);
//! ```

use crate::object::{ObjectHandle, ObjectModel};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Size override for one type
pub type SizeFn = Arc<dyn Fn(&dyn ObjectModel, ObjectHandle) -> anyhow::Result<isize> + Send + Sync>;

/// Table of size overrides keyed by type name
///
/// Registration order is preserved in [`all`](Self::all).
#[derive(Clone, Default)]
pub struct SpecialCaseRegistry {
    entries: IndexMap<String, SizeFn>,
}

impl SpecialCaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the size function for `type_name`
    ///
    /// Returns the function previously registered under that name.
    pub fn register<F>(&mut self, type_name: impl Into<String>, size_fn: F) -> Option<SizeFn>
    where
        F: Fn(&dyn ObjectModel, ObjectHandle) -> anyhow::Result<isize> + Send + Sync + 'static,
    {
        self.entries.insert(type_name.into(), Arc::new(size_fn))
    }

    /// Remove the size function for `type_name`
    pub fn unregister(&mut self, type_name: &str) -> Option<SizeFn> {
        self.entries.shift_remove(type_name)
    }

    /// Look up the size function for `type_name`
    pub fn get(&self, type_name: &str) -> Option<&SizeFn> {
        self.entries.get(type_name)
    }

    /// Snapshot of all registered functions, in registration order
    pub fn all(&self) -> IndexMap<String, SizeFn> {
        self.entries.clone()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SpecialCaseRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecialCaseRegistry")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Process-wide registry
lazy_static::lazy_static! {
    static ref GLOBAL_SPECIALS: RwLock<SpecialCaseRegistry> = RwLock::new(SpecialCaseRegistry::new());
}

/// Get the process-wide registry, created on first use
///
/// Registration while a dump holds a read guard blocks until the dump ends.
pub fn global() -> &'static RwLock<SpecialCaseRegistry> {
    &GLOBAL_SPECIALS
}

/// Register a size function in the process-wide registry
pub fn register_global<F>(type_name: impl Into<String>, size_fn: F) -> Option<SizeFn>
where
    F: Fn(&dyn ObjectModel, ObjectHandle) -> anyhow::Result<isize> + Send + Sync + 'static,
{
    GLOBAL_SPECIALS.write().register(type_name, size_fn)
}
