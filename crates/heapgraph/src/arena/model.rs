//! `ObjectModel` binding of the reference heap

use super::layout::table_layout;
use super::{Arena, Payload, TextStorage};
use crate::error::ModelError;
use crate::object::{HashTableLayout, ObjectHandle, ObjectKind, ObjectModel, TextUnits, TypeDescriptor};

impl ObjectModel for Arena {
    fn type_of(&self, obj: ObjectHandle) -> &TypeDescriptor {
        match self.slot(obj) {
            Some(slot) => self.descriptor(slot.ty),
            None => self.unknown_descriptor(),
        }
    }

    fn kind(&self, obj: ObjectHandle) -> ObjectKind {
        let Some(slot) = self.slot(obj) else {
            return ObjectKind::Other;
        };
        match slot.payload {
            Payload::None => ObjectKind::None,
            Payload::Bool(_) => ObjectKind::Bool,
            Payload::Int(_) => ObjectKind::Int,
            Payload::Bytes(_) => ObjectKind::Bytes,
            Payload::Text(_) => ObjectKind::Text,
            Payload::Tuple(_) => ObjectKind::Tuple,
            Payload::List { .. } => ObjectKind::List,
            Payload::Set(_) => ObjectKind::Set,
            Payload::Dict(_) => ObjectKind::Dict,
            Payload::Module { .. } => ObjectKind::Module,
            Payload::Function { .. } => ObjectKind::Function,
            Payload::Type { .. } => ObjectKind::Type,
            Payload::Class { .. } => ObjectKind::Class,
            Payload::Frame { .. } => ObjectKind::Frame,
            Payload::Instance { .. } => ObjectKind::Other,
        }
    }

    fn traverse(&self, obj: ObjectHandle, visit: &mut dyn FnMut(ObjectHandle)) {
        let Some(slot) = self.slot(obj) else {
            return;
        };
        match &slot.payload {
            Payload::Tuple(items) | Payload::Set(items) => items.iter().copied().for_each(visit),
            Payload::List { items, .. } => items.iter().copied().for_each(visit),
            Payload::Dict(entries) => {
                for &(key, value) in entries {
                    visit(key);
                    visit(value);
                }
            }
            Payload::Module { dict, .. } => dict.iter().copied().for_each(visit),
            Payload::Function { globals, .. } => globals.iter().copied().for_each(visit),
            Payload::Type { bases, .. } | Payload::Class { bases, .. } => {
                bases.iter().copied().for_each(visit)
            }
            Payload::Frame { locals, .. } => locals.iter().copied().for_each(visit),
            Payload::Instance { class, fields } => {
                fields.iter().copied().for_each(&mut *visit);
                class.iter().copied().for_each(visit);
            }
            Payload::None
            | Payload::Bool(_)
            | Payload::Int(_)
            | Payload::Bytes(_)
            | Payload::Text(_) => {}
        }
    }

    fn is_heap_type_object(&self, obj: ObjectHandle) -> bool {
        matches!(
            self.slot(obj).map(|s| &s.payload),
            Some(Payload::Type { heap: true, .. })
        )
    }

    fn item_count(&self, obj: ObjectHandle) -> Result<usize, ModelError> {
        let slot = self.slot(obj).ok_or(ModelError::Unsupported("item_count"))?;
        match &slot.payload {
            Payload::Tuple(items) | Payload::Set(items) => Ok(items.len()),
            Payload::List { items, .. } => Ok(items.len()),
            Payload::Dict(entries) => Ok(entries.len()),
            Payload::Bytes(b) => Ok(b.len()),
            Payload::Text(TextStorage::Ucs2(units)) => Ok(units.len()),
            Payload::Text(TextStorage::Ucs4(units)) => Ok(units.len()),
            Payload::Frame { locals, .. } => Ok(locals.len()),
            Payload::Instance { fields, .. } => Ok(fields.len()),
            _ => Err(ModelError::Unsupported("item_count")),
        }
    }

    fn allocated_slots(&self, obj: ObjectHandle) -> Result<usize, ModelError> {
        match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::List { allocated, .. }) => Ok(*allocated),
            _ => Err(ModelError::Unsupported("allocated_slots")),
        }
    }

    fn hash_table(&self, obj: ObjectHandle) -> Result<HashTableLayout, ModelError> {
        let used = match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::Set(items)) => items.len(),
            Some(Payload::Dict(entries)) => entries.len(),
            _ => return Err(ModelError::Unsupported("hash_table")),
        };
        let (slots, spilled) = table_layout(used);
        Ok(HashTableLayout { slots, spilled })
    }

    fn text_units(&self, obj: ObjectHandle) -> Option<TextUnits<'_>> {
        match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::Text(TextStorage::Ucs2(units))) => Some(TextUnits::Ucs2(units)),
            Some(Payload::Text(TextStorage::Ucs4(units))) => Some(TextUnits::Ucs4(units)),
            _ => None,
        }
    }

    fn byte_content(&self, obj: ObjectHandle) -> Option<&[u8]> {
        match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::Bytes(b)) => Some(b.as_slice()),
            _ => None,
        }
    }

    fn int_value(&self, obj: ObjectHandle) -> Option<i64> {
        match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::Int(v)) | Some(Payload::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    fn bool_singleton(&self, obj: ObjectHandle) -> Option<bool> {
        self.is_singleton_bool(obj)
    }

    fn object_name(&self, obj: ObjectHandle) -> Option<&str> {
        match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::Module { name, .. })
            | Some(Payload::Function { name, .. })
            | Some(Payload::Type { name, .. })
            | Some(Payload::Class { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    fn frame_code_name(&self, obj: ObjectHandle) -> Option<&str> {
        match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::Frame { code_name, .. }) => code_name.as_deref(),
            _ => None,
        }
    }

    fn self_report_size(&self, obj: ObjectHandle) -> Result<isize, ModelError> {
        self.slot(obj)
            .and_then(|s| s.self_size)
            .ok_or(ModelError::Unsupported("self_report_size"))
    }

    fn contains(&self, container: ObjectHandle, obj: ObjectHandle) -> Result<bool, ModelError> {
        self.check_hashable(obj)?;
        match self.slot(container).map(|s| &s.payload) {
            Some(Payload::Set(items)) => Ok(items.iter().any(|&m| self.values_equal(m, obj))),
            Some(Payload::Dict(entries)) => {
                Ok(entries.iter().any(|&(k, _)| self.values_equal(k, obj)))
            }
            _ => Err(ModelError::Unsupported("contains")),
        }
    }
}

impl Arena {
    /// Mutable containers cannot take part in a membership probe
    fn check_hashable(&self, obj: ObjectHandle) -> Result<(), ModelError> {
        match self.slot(obj).map(|s| &s.payload) {
            Some(Payload::List { .. }) | Some(Payload::Set(_)) | Some(Payload::Dict(_)) => {
                Err(ModelError::Unhashable {
                    type_name: self.type_of(obj).name().to_string(),
                })
            }
            Some(Payload::Tuple(items)) => {
                items.iter().try_for_each(|&item| self.check_hashable(item))
            }
            _ => Ok(()),
        }
    }

    /// Runtime value equality
    ///
    /// Numbers compare by value across int and bool, text and bytes by
    /// content, tuples element-wise. Everything else compares by identity.
    pub(crate) fn values_equal(&self, a: ObjectHandle, b: ObjectHandle) -> bool {
        if a == b {
            return true;
        }
        let (Some(sa), Some(sb)) = (self.slot(a), self.slot(b)) else {
            return false;
        };
        match (&sa.payload, &sb.payload) {
            (Payload::None, Payload::None) => true,
            (Payload::Int(x) | Payload::Bool(x), Payload::Int(y) | Payload::Bool(y)) => x == y,
            (Payload::Bytes(x), Payload::Bytes(y)) => x == y,
            (Payload::Text(x), Payload::Text(y)) => text_eq(x, y),
            (Payload::Tuple(x), Payload::Tuple(y)) => {
                x.len() == y.len()
                    && x.iter().zip(y).all(|(&p, &q)| self.values_equal(p, q))
            }
            _ => false,
        }
    }
}

fn text_eq(a: &TextStorage, b: &TextStorage) -> bool {
    match (a, b) {
        (TextStorage::Ucs4(x), TextStorage::Ucs4(y)) => x == y,
        (TextStorage::Ucs2(x), TextStorage::Ucs2(y)) => x == y,
        (TextStorage::Ucs2(narrow), TextStorage::Ucs4(wide))
        | (TextStorage::Ucs4(wide), TextStorage::Ucs2(narrow)) => {
            char::decode_utf16(narrow.iter().copied())
                .map(|c| c.map(u32::from).unwrap_or(0xfffd))
                .eq(wide.iter().copied())
        }
    }
}
