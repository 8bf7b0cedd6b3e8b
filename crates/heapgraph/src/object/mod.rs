//! Object Module - The runtime-facing object model
//!
//! heapgraph never looks inside a managed object itself. Everything it needs
//! is asked through [`ObjectModel`], implemented by the runtime binding:
//!
//! ```text
//! ┌──────────────────┐          ┌───────────────────────────┐
//! │    heapgraph     │          │      runtime binding      │
//! │                  │          │                           │
//! │  SizeEstimator   │◀─────────│   impl ObjectModel        │
//! │  GraphDumper     │          │   (type_of, kind,         │
//! │                  │          │    traverse, accessors)   │
//! └──────────────────┘          └───────────────────────────┘
//! ```
//!
//! [`ObjectKind`] replaces type-code branching: the binding reports which
//! family an object belongs to and the core dispatches on that.

pub mod descriptor;

pub use descriptor::{TypeDescriptor, CYCLE_TRACKED, HEAP_TYPE, TRAVERSABLE};

use crate::error::ModelError;
use std::fmt;

/// Opaque identity of a live heap object
///
/// The address is only used as a cross-reference key in dump records; the
/// core never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(usize);

impl ObjectHandle {
    #[inline]
    pub const fn from_address(address: usize) -> Self {
        Self(address)
    }

    #[inline]
    pub const fn address(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Object family reported by the binding
///
/// Families drive both size estimation and the optional record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Growable sequence with a separately allocated slot array
    List,
    /// Hash set (mutable or frozen)
    Set,
    /// Hash mapping
    Dict,
    /// Character text with a known code-unit width
    Text,
    /// Immutable sequence with inline slots
    Tuple,
    /// Byte string with inline storage
    Bytes,
    /// Machine-sized integer
    Int,
    /// Boolean (normally one of two singletons)
    Bool,
    /// The null/none singleton
    None,
    Module,
    Function,
    /// Type/class object
    Type,
    /// Old-style class object
    Class,
    /// Execution stack frame
    Frame,
    /// Anything else
    Other,
}

impl ObjectKind {
    /// Families whose size is derived from their own layout accounting
    #[inline]
    pub fn is_known_family(self) -> bool {
        matches!(
            self,
            ObjectKind::List | ObjectKind::Set | ObjectKind::Dict | ObjectKind::Text
        )
    }

    /// Built-in values sized by basic + inline items without any callback
    #[inline]
    pub fn is_trivial_family(self) -> bool {
        matches!(
            self,
            ObjectKind::Tuple
                | ObjectKind::Bytes
                | ObjectKind::Int
                | ObjectKind::Bool
                | ObjectKind::None
                | ObjectKind::Module
        )
    }
}

/// Code units of a text object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextUnits<'a> {
    /// One byte per character
    Narrow(&'a [u8]),
    /// Two bytes per code unit
    Ucs2(&'a [u16]),
    /// Four bytes per code unit
    Ucs4(&'a [u32]),
}

impl TextUnits<'_> {
    /// Number of code units
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            TextUnits::Narrow(s) => s.len(),
            TextUnits::Ucs2(s) => s.len(),
            TextUnits::Ucs4(s) => s.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per code unit
    #[inline]
    pub fn unit_width(&self) -> usize {
        match self {
            TextUnits::Narrow(_) => 1,
            TextUnits::Ucs2(_) => 2,
            TextUnits::Ucs4(_) => 4,
        }
    }
}

/// Table geometry of a hash set or mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashTableLayout {
    /// Number of slots in the active table
    pub slots: usize,
    /// The table lives outside the object's inline small table
    pub spilled: bool,
}

/// Capability interface a runtime implements to be inspected
///
/// Only `type_of`, `kind` and `traverse` are mandatory. Accessors a runtime
/// cannot answer keep their default, which reports "unsupported" and makes
/// the core fall back.
///
/// The trait is object safe so special-case size functions can receive
/// `&dyn ObjectModel`.
///
/// # Safety of the heap
///
/// Handles are only valid while the heap is quiescent. Callers must stop
/// any collector or mutator for the duration of a dump.
pub trait ObjectModel {
    /// Type descriptor of the object's type
    fn type_of(&self, obj: ObjectHandle) -> &TypeDescriptor;

    /// Family of the object
    fn kind(&self, obj: ObjectHandle) -> ObjectKind;

    /// Call `visit` for each direct outgoing reference, in a stable order
    ///
    /// Only called when [`traversal_permitted`] holds for `obj`.
    fn traverse(&self, obj: ObjectHandle, visit: &mut dyn FnMut(ObjectHandle));

    fn is_cycle_tracked(&self, obj: ObjectHandle) -> bool {
        self.type_of(obj).is_cycle_tracked()
    }

    fn is_traversable(&self, obj: ObjectHandle) -> bool {
        self.type_of(obj).is_traversable()
    }

    /// `obj` is a type object created at runtime
    fn is_heap_type_object(&self, _obj: ObjectHandle) -> bool {
        false
    }

    /// Collect the direct references of `obj`
    fn references(&self, obj: ObjectHandle) -> Vec<ObjectHandle> {
        let mut refs = Vec::new();
        self.traverse(obj, &mut |r| refs.push(r));
        refs
    }

    /// Element count (tuple, list, set, dict) or inline item count
    fn item_count(&self, _obj: ObjectHandle) -> Result<usize, ModelError> {
        Err(ModelError::Unsupported("item_count"))
    }

    /// Allocated slot count of a list
    fn allocated_slots(&self, _obj: ObjectHandle) -> Result<usize, ModelError> {
        Err(ModelError::Unsupported("allocated_slots"))
    }

    /// Table geometry of a set or dict
    fn hash_table(&self, _obj: ObjectHandle) -> Result<HashTableLayout, ModelError> {
        Err(ModelError::Unsupported("hash_table"))
    }

    /// Code units of a text object
    fn text_units(&self, _obj: ObjectHandle) -> Option<TextUnits<'_>> {
        None
    }

    /// Content of a byte string
    fn byte_content(&self, _obj: ObjectHandle) -> Option<&[u8]> {
        None
    }

    /// Numeric value of an int or bool
    fn int_value(&self, _obj: ObjectHandle) -> Option<i64> {
        None
    }

    /// `Some(true)`/`Some(false)` when `obj` is the canonical true/false
    /// singleton, `None` for anything else
    fn bool_singleton(&self, _obj: ObjectHandle) -> Option<bool> {
        None
    }

    /// Declared name of a module, function, type or old-style class
    fn object_name(&self, _obj: ObjectHandle) -> Option<&str> {
        None
    }

    /// Name of the code object executing in a frame
    fn frame_code_name(&self, _obj: ObjectHandle) -> Option<&str> {
        None
    }

    /// Size the object reports for itself, excluding the GC header
    fn self_report_size(&self, _obj: ObjectHandle) -> Result<isize, ModelError> {
        Err(ModelError::Unsupported("self_report_size"))
    }

    /// Equality-based membership of `obj` in the runtime container
    fn contains(&self, _container: ObjectHandle, _obj: ObjectHandle) -> Result<bool, ModelError> {
        Err(ModelError::Unsupported("contains"))
    }
}

/// Whether the dumper may ask for the references of `obj`
///
/// Non-traversable objects have no reference hook at all. Static type
/// objects share the type traversal hook but must not be walked with it.
pub fn traversal_permitted<M: ObjectModel + ?Sized>(model: &M, obj: ObjectHandle) -> bool {
    if !model.is_traversable(obj) {
        return false;
    }
    !(model.kind(obj) == ObjectKind::Type && !model.is_heap_type_object(obj))
}

/// Direct references of `obj` without sizing or emission
///
/// Returns an empty list for objects that may not be traversed.
pub fn referents<M: ObjectModel + ?Sized>(model: &M, obj: ObjectHandle) -> Vec<ObjectHandle> {
    if !traversal_permitted(model, obj) {
        return Vec::new();
    }
    model.references(obj)
}
