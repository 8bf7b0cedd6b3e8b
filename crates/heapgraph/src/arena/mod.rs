//! Arena - In-memory reference heap
//!
//! A small managed heap that implements [`ObjectModel`] with the layouts of
//! a 64-bit dynamic-language interpreter. It backs the test suite and serves
//! as a reference binding for runtimes that want to plug into heapgraph.
//!
//! Objects are never freed. Handles are synthetic addresses:
//!
//! ```text
//! address = ARENA_BASE + index * OBJECT_ALIGNMENT
//! ```
//!
//! # Example
//!
//! ```rust
//! use heapgraph::arena::Arena;
//! use heapgraph::object::{ObjectKind, ObjectModel};
//!
//! let mut heap = Arena::new();
//! let one = heap.int(1);
//! let list = heap.list(&[one]);
//!
//! assert_eq!(heap.kind(list), ObjectKind::List);
//! assert_eq!(heap.references(list), vec![one]);
//! ```

pub mod layout;
mod model;

pub use layout::TypeId;

use crate::error::ModelError;
use crate::object::{ObjectHandle, TypeDescriptor};
use layout::{class_instance_descriptor, list_growth, Builtins};
use rustc_hash::FxHashMap;

/// Address of the first object
pub const ARENA_BASE: usize = 0x1000_0000;

/// Distance between consecutive object addresses
pub const OBJECT_ALIGNMENT: usize = 16;

/// Character storage of a text object
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TextStorage {
    Ucs2(Vec<u16>),
    Ucs4(Vec<u32>),
}

#[derive(Debug, Clone)]
pub(crate) enum Payload {
    None,
    Bool(i64),
    Int(i64),
    Bytes(Vec<u8>),
    Text(TextStorage),
    Tuple(Vec<ObjectHandle>),
    List {
        items: Vec<ObjectHandle>,
        allocated: usize,
    },
    Set(Vec<ObjectHandle>),
    Dict(Vec<(ObjectHandle, ObjectHandle)>),
    Module {
        name: String,
        dict: Option<ObjectHandle>,
    },
    Function {
        name: String,
        globals: Option<ObjectHandle>,
    },
    Type {
        name: String,
        heap: bool,
        bases: Vec<ObjectHandle>,
        instance_type: Option<TypeId>,
    },
    Class {
        name: String,
        bases: Vec<ObjectHandle>,
    },
    Frame {
        code_name: Option<String>,
        locals: Vec<ObjectHandle>,
    },
    Instance {
        class: Option<ObjectHandle>,
        fields: Vec<ObjectHandle>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub ty: TypeId,
    pub payload: Payload,
    pub self_size: Option<isize>,
}

/// Reference heap
#[derive(Debug, Clone)]
pub struct Arena {
    types: Vec<TypeDescriptor>,
    builtins: Builtins,
    slots: Vec<Slot>,
    type_objects: FxHashMap<String, ObjectHandle>,
    none: ObjectHandle,
    true_: ObjectHandle,
    false_: ObjectHandle,
    unknown: TypeDescriptor,
}

impl Arena {
    /// Create a heap holding only the none/true/false singletons
    pub fn new() -> Self {
        let mut types = Vec::new();
        let builtins = Builtins::install(&mut types);

        let mut arena = Self {
            types,
            builtins,
            slots: Vec::new(),
            type_objects: FxHashMap::default(),
            none: ObjectHandle::from_address(0),
            true_: ObjectHandle::from_address(0),
            false_: ObjectHandle::from_address(0),
            unknown: TypeDescriptor::new("<unknown>", 0, 0, 0),
        };
        arena.none = arena.alloc(builtins.none, Payload::None);
        arena.true_ = arena.alloc(builtins.bool_, Payload::Bool(1));
        arena.false_ = arena.alloc(builtins.bool_, Payload::Bool(0));
        arena
    }

    /// Number of live objects, singletons included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every object in allocation order
    pub fn handles(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        (0..self.slots.len()).map(handle_at)
    }

    fn alloc(&mut self, ty: TypeId, payload: Payload) -> ObjectHandle {
        self.slots.push(Slot {
            ty,
            payload,
            self_size: None,
        });
        handle_at(self.slots.len() - 1)
    }

    pub(crate) fn slot(&self, obj: ObjectHandle) -> Option<&Slot> {
        index_of(obj).and_then(|i| self.slots.get(i))
    }

    fn slot_mut(&mut self, obj: ObjectHandle) -> Result<&mut Slot, ModelError> {
        index_of(obj)
            .and_then(|i| self.slots.get_mut(i))
            .ok_or_else(|| ModelError::Failed(format!("no object at {}", obj)))
    }

    pub(crate) fn descriptor(&self, ty: TypeId) -> &TypeDescriptor {
        self.types.get(ty.0).unwrap_or(&self.unknown)
    }

    pub(crate) fn unknown_descriptor(&self) -> &TypeDescriptor {
        &self.unknown
    }

    pub(crate) fn is_singleton_bool(&self, obj: ObjectHandle) -> Option<bool> {
        if obj == self.true_ {
            Some(true)
        } else if obj == self.false_ {
            Some(false)
        } else {
            None
        }
    }

    // Types

    /// Register a custom type layout
    pub fn define_type(&mut self, descriptor: TypeDescriptor) -> TypeId {
        self.types.push(descriptor);
        TypeId(self.types.len() - 1)
    }

    /// The statically allocated type object called `name`
    ///
    /// Repeated calls with the same name return the same object.
    pub fn builtin_type_object(&mut self, name: &str) -> ObjectHandle {
        if let Some(&obj) = self.type_objects.get(name) {
            return obj;
        }
        let obj = self.alloc(
            self.builtins.type_,
            Payload::Type {
                name: name.to_string(),
                heap: false,
                bases: Vec::new(),
                instance_type: None,
            },
        );
        self.type_objects.insert(name.to_string(), obj);
        obj
    }

    /// A class created at runtime; its instances get their own layout
    pub fn class_type(&mut self, name: &str, bases: &[ObjectHandle]) -> ObjectHandle {
        let instance_type = self.define_type(class_instance_descriptor(name));
        self.alloc(
            self.builtins.type_,
            Payload::Type {
                name: name.to_string(),
                heap: true,
                bases: bases.to_vec(),
                instance_type: Some(instance_type),
            },
        )
    }

    /// Instance layout of a class made by [`class_type`](Self::class_type)
    pub fn instance_type(&self, class: ObjectHandle) -> Option<TypeId> {
        match self.slot(class)?.payload {
            Payload::Type { instance_type, .. } => instance_type,
            _ => None,
        }
    }

    /// An old-style class object
    pub fn old_class(&mut self, name: &str, bases: &[ObjectHandle]) -> ObjectHandle {
        self.alloc(
            self.builtins.classobj,
            Payload::Class {
                name: name.to_string(),
                bases: bases.to_vec(),
            },
        )
    }

    // Scalars

    /// The none singleton
    pub fn none(&self) -> ObjectHandle {
        self.none
    }

    /// The canonical true/false singleton
    pub fn bool(&self, value: bool) -> ObjectHandle {
        if value {
            self.true_
        } else {
            self.false_
        }
    }

    /// A bool object that is not one of the singletons
    pub fn bool_object(&mut self, value: i64) -> ObjectHandle {
        self.alloc(self.builtins.bool_, Payload::Bool(value))
    }

    pub fn int(&mut self, value: i64) -> ObjectHandle {
        self.alloc(self.builtins.int, Payload::Int(value))
    }

    /// Byte string
    pub fn bytes(&mut self, value: &[u8]) -> ObjectHandle {
        self.alloc(self.builtins.bytes, Payload::Bytes(value.to_vec()))
    }

    /// Text stored as UCS-4 code units
    pub fn text(&mut self, value: &str) -> ObjectHandle {
        let units = value.chars().map(u32::from).collect();
        self.alloc(self.builtins.text, Payload::Text(TextStorage::Ucs4(units)))
    }

    /// Text stored as UTF-16 code units, as on narrow builds
    pub fn text_ucs2(&mut self, value: &str) -> ObjectHandle {
        let units = value.encode_utf16().collect();
        self.alloc(self.builtins.text, Payload::Text(TextStorage::Ucs2(units)))
    }

    // Containers

    pub fn tuple(&mut self, items: &[ObjectHandle]) -> ObjectHandle {
        self.alloc(self.builtins.tuple, Payload::Tuple(items.to_vec()))
    }

    /// List with exactly as many slots as items
    pub fn list(&mut self, items: &[ObjectHandle]) -> ObjectHandle {
        self.list_with_capacity(items, items.len())
    }

    /// List with at least `capacity` allocated slots
    pub fn list_with_capacity(&mut self, items: &[ObjectHandle], capacity: usize) -> ObjectHandle {
        self.alloc(
            self.builtins.list,
            Payload::List {
                items: items.to_vec(),
                allocated: capacity.max(items.len()),
            },
        )
    }

    /// Append to a list, over-allocating when it runs out of slots
    pub fn list_push(&mut self, list: ObjectHandle, item: ObjectHandle) -> Result<(), ModelError> {
        match &mut self.slot_mut(list)?.payload {
            Payload::List { items, allocated } => {
                items.push(item);
                if items.len() > *allocated {
                    *allocated = list_growth(items.len());
                }
                Ok(())
            }
            _ => Err(ModelError::Failed(format!("{} is not a list", list))),
        }
    }

    /// Set of the given members; members equal to an earlier one are dropped
    pub fn set(&mut self, items: &[ObjectHandle]) -> ObjectHandle {
        let mut members: Vec<ObjectHandle> = Vec::with_capacity(items.len());
        for &item in items {
            if !members.iter().any(|&m| self.values_equal(m, item)) {
                members.push(item);
            }
        }
        self.alloc(self.builtins.set, Payload::Set(members))
    }

    /// Mapping of the given pairs; a repeated key keeps the later value
    pub fn dict(&mut self, pairs: &[(ObjectHandle, ObjectHandle)]) -> ObjectHandle {
        let mut entries: Vec<(ObjectHandle, ObjectHandle)> = Vec::with_capacity(pairs.len());
        for &(key, value) in pairs {
            match entries.iter_mut().find(|(k, _)| self.values_equal(*k, key)) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
        self.alloc(self.builtins.dict, Payload::Dict(entries))
    }

    // Runtime objects

    pub fn module(&mut self, name: &str, dict: Option<ObjectHandle>) -> ObjectHandle {
        self.alloc(
            self.builtins.module,
            Payload::Module {
                name: name.to_string(),
                dict,
            },
        )
    }

    pub fn function(&mut self, name: &str, globals: Option<ObjectHandle>) -> ObjectHandle {
        self.alloc(
            self.builtins.function,
            Payload::Function {
                name: name.to_string(),
                globals,
            },
        )
    }

    /// Stack frame; `code_name` is absent for frames without code
    pub fn frame(&mut self, code_name: Option<&str>, locals: &[ObjectHandle]) -> ObjectHandle {
        self.alloc(
            self.builtins.frame,
            Payload::Frame {
                code_name: code_name.map(str::to_string),
                locals: locals.to_vec(),
            },
        )
    }

    /// Instance of a custom layout holding `fields`
    pub fn instance(&mut self, ty: TypeId, fields: &[ObjectHandle]) -> ObjectHandle {
        self.alloc(
            ty,
            Payload::Instance {
                class: None,
                fields: fields.to_vec(),
            },
        )
    }

    /// Instance of a class made by [`class_type`](Self::class_type)
    ///
    /// The instance references its fields and then its class.
    pub fn class_instance(
        &mut self,
        class: ObjectHandle,
        fields: &[ObjectHandle],
    ) -> Result<ObjectHandle, ModelError> {
        let ty = self
            .instance_type(class)
            .ok_or_else(|| ModelError::Failed(format!("{} is not a heap class", class)))?;
        Ok(self.alloc(
            ty,
            Payload::Instance {
                class: Some(class),
                fields: fields.to_vec(),
            },
        ))
    }

    /// Plain instance of the root object type
    pub fn object(&mut self) -> ObjectHandle {
        self.alloc(
            self.builtins.object,
            Payload::Instance {
                class: None,
                fields: Vec::new(),
            },
        )
    }

    /// Size the object reports for itself; `None` removes the report
    pub fn set_self_size(&mut self, obj: ObjectHandle, size: Option<isize>) -> Result<(), ModelError> {
        self.slot_mut(obj)?.self_size = size;
        Ok(())
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

fn handle_at(index: usize) -> ObjectHandle {
    ObjectHandle::from_address(ARENA_BASE + index * OBJECT_ALIGNMENT)
}

fn index_of(obj: ObjectHandle) -> Option<usize> {
    let offset = obj.address().checked_sub(ARENA_BASE)?;
    if offset % OBJECT_ALIGNMENT != 0 {
        return None;
    }
    Some(offset / OBJECT_ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{HashTableLayout, ObjectKind, ObjectModel, TextUnits};

    #[test]
    fn test_singletons() {
        let heap = Arena::new();
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.kind(heap.none()), ObjectKind::None);
        assert_eq!(heap.bool_singleton(heap.bool(true)), Some(true));
        assert_eq!(heap.bool_singleton(heap.bool(false)), Some(false));
        assert_ne!(heap.bool(true), heap.bool(false));
    }

    #[test]
    fn test_addresses_are_aligned_and_distinct() {
        let mut heap = Arena::new();
        let a = heap.int(1);
        let b = heap.int(1);
        assert_ne!(a, b);
        assert_eq!(b.address() - a.address(), OBJECT_ALIGNMENT);
        assert_eq!(heap.handles().count(), heap.len());
    }

    #[test]
    fn test_list_push_over_allocates() {
        let mut heap = Arena::new();
        let list = heap.list(&[]);
        let one = heap.int(1);
        heap.list_push(list, one).unwrap();
        assert_eq!(heap.item_count(list), Ok(1));
        assert_eq!(heap.allocated_slots(list), Ok(4));

        for _ in 0..3 {
            heap.list_push(list, one).unwrap();
        }
        assert_eq!(heap.allocated_slots(list), Ok(4));
        heap.list_push(list, one).unwrap();
        assert_eq!(heap.allocated_slots(list), Ok(8));
    }

    #[test]
    fn test_list_push_rejects_non_list() {
        let mut heap = Arena::new();
        let one = heap.int(1);
        assert!(heap.list_push(one, one).is_err());
    }

    #[test]
    fn test_set_drops_equal_members() {
        let mut heap = Arena::new();
        let a = heap.text("x");
        let b = heap.text("x");
        let set = heap.set(&[a, b]);
        assert_eq!(heap.item_count(set), Ok(1));
        assert_eq!(
            heap.hash_table(set),
            Ok(HashTableLayout {
                slots: 8,
                spilled: false
            })
        );
    }

    #[test]
    fn test_dict_references_alternate_keys_and_values() {
        let mut heap = Arena::new();
        let k1 = heap.text("a");
        let v1 = heap.int(1);
        let k2 = heap.text("b");
        let v2 = heap.int(2);
        let dict = heap.dict(&[(k1, v1), (k2, v2)]);
        assert_eq!(heap.references(dict), vec![k1, v1, k2, v2]);
    }

    #[test]
    fn test_ucs2_text_uses_surrogates() {
        let mut heap = Arena::new();
        let t = heap.text_ucs2("a\u{1F600}");
        match heap.text_units(t) {
            Some(TextUnits::Ucs2(units)) => assert_eq!(units, &[0x61, 0xd83d, 0xde00]),
            other => panic!("unexpected text units: {:?}", other),
        }
    }

    #[test]
    fn test_class_instance_references_class() {
        let mut heap = Arena::new();
        let object = heap.builtin_type_object("object");
        assert_eq!(heap.builtin_type_object("object"), object);

        let class = heap.class_type("Point", &[object]);
        let x = heap.int(3);
        let p = heap.class_instance(class, &[x]).unwrap();
        assert_eq!(heap.type_of(p).name(), "Point");
        assert_eq!(heap.references(p), vec![x, class]);
        assert!(heap.class_instance(object, &[]).is_err());
    }

    #[test]
    fn test_unknown_handle() {
        let heap = Arena::new();
        let bogus = ObjectHandle::from_address(7);
        assert_eq!(heap.type_of(bogus).name(), "<unknown>");
        assert_eq!(heap.kind(bogus), ObjectKind::Other);
        assert!(heap.references(bogus).is_empty());
    }
}
