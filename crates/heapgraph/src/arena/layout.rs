//! Built-in type layouts of the reference heap
//!
//! Sizes follow a 64-bit interpreter with 16-byte object heads:
//!
//! ```text
//! type        basic  item  flags
//! NoneType       16     0  -
//! bool           24     0  -
//! int            24     0  -
//! str            37     1  -
//! unicode        48     0  -
//! tuple          24     8  tracked, traversable
//! list           40     0  tracked, traversable
//! set           200     0  tracked, traversable
//! dict          248     0  tracked, traversable
//! module         24     0  tracked, traversable
//! function       88     0  tracked, traversable
//! type          872     0  tracked, traversable
//! classobj       64     0  tracked, traversable
//! frame         384     8  tracked, traversable
//! object         16     0  -
//! ```

use crate::object::{TypeDescriptor, CYCLE_TRACKED, HEAP_TYPE, TRAVERSABLE};

/// Machine word of the reference heap
pub const WORD: usize = 8;

/// Basic size of instances of a runtime-created class
/// (head, instance dict and weakref list)
pub const INSTANCE_BASIC_SIZE: usize = 4 * WORD;

const CONTAINER: u32 = CYCLE_TRACKED | TRAVERSABLE;

/// Index into the arena's type table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) usize);

/// Type ids of the built-in layouts
#[derive(Debug, Clone, Copy)]
pub(crate) struct Builtins {
    pub none: TypeId,
    pub bool_: TypeId,
    pub int: TypeId,
    pub bytes: TypeId,
    pub text: TypeId,
    pub tuple: TypeId,
    pub list: TypeId,
    pub set: TypeId,
    pub dict: TypeId,
    pub module: TypeId,
    pub function: TypeId,
    pub type_: TypeId,
    pub classobj: TypeId,
    pub frame: TypeId,
    pub object: TypeId,
}

impl Builtins {
    /// Append the built-in descriptors to `types`
    pub fn install(types: &mut Vec<TypeDescriptor>) -> Self {
        let mut add = |name: &'static str, basic: usize, item: usize, flags: u32| {
            types.push(TypeDescriptor::new(name, basic, item, flags));
            TypeId(types.len() - 1)
        };

        Self {
            none: add("NoneType", 2 * WORD, 0, 0),
            bool_: add("bool", 3 * WORD, 0, 0),
            int: add("int", 3 * WORD, 0, 0),
            bytes: add("str", 37, 1, 0),
            text: add("unicode", 6 * WORD, 0, 0),
            tuple: add("tuple", 3 * WORD, WORD, CONTAINER),
            list: add("list", 5 * WORD, 0, CONTAINER),
            set: add("set", 25 * WORD, 0, CONTAINER),
            dict: add("dict", 31 * WORD, 0, CONTAINER),
            module: add("module", 3 * WORD, 0, CONTAINER),
            function: add("function", 11 * WORD, 0, CONTAINER),
            type_: add("type", 109 * WORD, 0, CONTAINER),
            classobj: add("classobj", 8 * WORD, 0, CONTAINER),
            frame: add("frame", 48 * WORD, WORD, CONTAINER),
            object: add("object", 2 * WORD, 0, 0),
        }
    }
}

/// Descriptor for instances of a runtime-created class
pub(crate) fn class_instance_descriptor(name: &str) -> TypeDescriptor {
    TypeDescriptor::new(name.to_string(), INSTANCE_BASIC_SIZE, 0, CONTAINER | HEAP_TYPE)
}

/// Slot count of a hash table holding `used` entries
///
/// Tables of up to five entries live in the 8-slot inline table. Larger
/// tables are resized to the next power of two above four times the
/// fill (twice the fill for very large tables).
pub(crate) fn table_layout(used: usize) -> (usize, bool) {
    const INLINE_SLOTS: usize = 8;
    const INLINE_MAX_USED: usize = 5;

    if used <= INLINE_MAX_USED {
        return (INLINE_SLOTS, false);
    }
    let target = if used > 50_000 { used * 2 } else { used * 4 };
    (target.next_power_of_two().max(INLINE_SLOTS), true)
}

/// Allocated slot count after a list grows to `new_len`
pub(crate) fn list_growth(new_len: usize) -> usize {
    new_len + (new_len >> 3) + if new_len < 9 { 3 } else { 6 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_layout() {
        assert_eq!(table_layout(0), (8, false));
        assert_eq!(table_layout(5), (8, false));
        assert_eq!(table_layout(6), (32, true));
        assert_eq!(table_layout(100), (512, true));
    }

    #[test]
    fn test_list_growth() {
        assert_eq!(list_growth(1), 4);
        assert_eq!(list_growth(5), 8);
        assert_eq!(list_growth(9), 16);
        assert_eq!(list_growth(17), 25);
    }

    #[test]
    fn test_builtin_descriptors() {
        let mut types = Vec::new();
        let b = Builtins::install(&mut types);
        assert_eq!(types[b.list.0].name(), "list");
        assert_eq!(types[b.dict.0].basic_size(), 248);
        assert!(types[b.tuple.0].is_var_sized());
        assert!(!types[b.int.0].is_cycle_tracked());
    }
}
