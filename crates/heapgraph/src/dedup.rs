//! Dedup Cache - Suppress an immediately repeated emission
//!
//! Walking an interned-string table visits the same string twice in a row.
//! Remembering only the last emitted object catches that without allocating.
//! This is not cycle detection; see [`crate::walk`] for seen-set walks.

use crate::object::ObjectHandle;

#[derive(Debug, Default, Clone)]
pub struct DedupCache {
    last: Option<ObjectHandle>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `obj` is the object emitted last
    #[inline]
    pub fn should_skip(&self, obj: ObjectHandle) -> bool {
        self.last == Some(obj)
    }

    #[inline]
    pub fn record(&mut self, obj: ObjectHandle) {
        self.last = Some(obj);
    }

    #[inline]
    pub fn last(&self) -> Option<ObjectHandle> {
        self.last
    }

    /// Forget the last emission; call between independent dumps
    #[inline]
    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_remembers_last() {
        let a = ObjectHandle::from_address(0x10);
        let b = ObjectHandle::from_address(0x20);
        let mut cache = DedupCache::new();

        assert!(!cache.should_skip(a));
        cache.record(a);
        assert!(cache.should_skip(a));

        cache.record(b);
        assert!(!cache.should_skip(a));
        assert!(cache.should_skip(b));

        cache.clear();
        assert!(!cache.should_skip(b));
        assert_eq!(cache.last(), None);
    }
}
