//! Type Descriptor - Per-type layout and capability metadata
//!
//! Flags Layout (u32):
//! ┌─────────────────────────────────────────┐
//! │  Bit 0: CYCLE_TRACKED (carries GC head) │
//! │  Bit 1: TRAVERSABLE (enumerates refs)   │
//! │  Bit 2: HEAP_TYPE (dynamically created) │
//! │  Bits 3-31: reserved                    │
//! └─────────────────────────────────────────┘
//!
//! The descriptor describes *instances* of the type. Whether a particular
//! type *object* is a heap type is a separate adapter question, see
//! [`ObjectModel::is_heap_type_object`](super::ObjectModel::is_heap_type_object).

use std::borrow::Cow;

/// Flag bit positions
pub const CYCLE_TRACKED_BIT: u32 = 0;
pub const TRAVERSABLE_BIT: u32 = 1;
pub const HEAP_TYPE_BIT: u32 = 2;

/// Masks for descriptor flags
pub const CYCLE_TRACKED: u32 = 1 << CYCLE_TRACKED_BIT;
pub const TRAVERSABLE: u32 = 1 << TRAVERSABLE_BIT;
pub const HEAP_TYPE: u32 = 1 << HEAP_TYPE_BIT;

/// Per-type layout information used by the size estimator and the dumper
///
/// # Example
///
/// ```rust
/// use heapgraph::object::{TypeDescriptor, CYCLE_TRACKED, TRAVERSABLE};
///
/// let tuple = TypeDescriptor::new("tuple", 24, 8, CYCLE_TRACKED | TRAVERSABLE);
/// assert!(tuple.is_var_sized());
/// assert!(tuple.is_cycle_tracked());
/// assert!(!tuple.is_heap_type());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: Cow<'static, str>,
    basic_size: usize,
    item_size: usize,
    flags: u32,
}

impl TypeDescriptor {
    /// Create a descriptor
    ///
    /// # Arguments
    /// * `name` - Human-readable type name, written to every record
    /// * `basic_size` - Fixed part of the instance layout in bytes
    /// * `item_size` - Bytes per inline item, 0 for fixed-size types
    /// * `flags` - Combination of `CYCLE_TRACKED`, `TRAVERSABLE`, `HEAP_TYPE`
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        basic_size: usize,
        item_size: usize,
        flags: u32,
    ) -> Self {
        Self {
            name: name.into(),
            basic_size,
            item_size,
            flags,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn basic_size(&self) -> usize {
        self.basic_size
    }

    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Instances carry variable-length inline storage
    #[inline]
    pub fn is_var_sized(&self) -> bool {
        self.item_size != 0
    }

    /// Instances participate in cyclic-garbage tracking
    #[inline]
    pub fn is_cycle_tracked(&self) -> bool {
        self.flags & CYCLE_TRACKED != 0
    }

    /// Instances can enumerate their outgoing references
    #[inline]
    pub fn is_traversable(&self) -> bool {
        self.flags & TRAVERSABLE != 0
    }

    /// The type was created at runtime rather than statically defined
    #[inline]
    pub fn is_heap_type(&self) -> bool {
        self.flags & HEAP_TYPE != 0
    }

    /// Return a copy with additional flags set
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags |= flags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_size_descriptor() {
        let int = TypeDescriptor::new("int", 24, 0, 0);
        assert_eq!(int.name(), "int");
        assert!(!int.is_var_sized());
        assert!(!int.is_cycle_tracked());
        assert!(!int.is_traversable());
    }

    #[test]
    fn test_owned_name() {
        let name = format!("pkg.{}", "Widget");
        let ty = TypeDescriptor::new(name, 32, 0, TRAVERSABLE);
        assert_eq!(ty.name(), "pkg.Widget");
    }

    #[test]
    fn test_with_flags() {
        let ty = TypeDescriptor::new("Foo", 32, 0, TRAVERSABLE).with_flags(CYCLE_TRACKED | HEAP_TYPE);
        assert!(ty.is_cycle_tracked());
        assert!(ty.is_traversable());
        assert!(ty.is_heap_type());
        assert_eq!(ty.flags(), 0b111);
    }
}
