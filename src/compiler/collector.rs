// compiler/collector.rs
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Identity-deduplicating registry handing out dense array indices.
///
/// The first registration of an identity assigns the next integer; repeated
/// registrations return the same index, so the index space is contiguous
/// `0..len` in registration order for the life of the collector.
pub struct Collector<K> {
    indices: HashMap<K, usize>,
    items: Vec<K>,
}

/// Snapshot token of a collector's registered identity set, used to detect
/// "has this resource set changed since last compile". Comparison is by
/// identity and count, never by resource contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle<K>(Vec<K>);

impl<K: Copy + Eq + Hash + Debug> Collector<K> {
    pub fn new() -> Self {
        Self {
            indices: HashMap::new(),
            items: Vec::new(),
        }
    }

    pub fn register(&mut self, id: K) -> usize {
        if let Some(&index) = self.indices.get(&id) {
            return index;
        }
        let index = self.items.len();
        self.indices.insert(id, index);
        self.items.push(id);
        index
    }

    pub fn lookup(&self, id: K) -> Result<usize> {
        self.indices
            .get(&id)
            .copied()
            .ok_or_else(|| Error::UnknownResource(format!("{id:?} was never registered")))
    }

    /// Identities in ascending index order. Restart by calling again.
    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bundle(&self) -> Bundle<K> {
        Bundle(self.items.clone())
    }
}

impl<K: Copy + Eq + Hash + Debug> Default for Collector<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut c = Collector::new();
        assert_eq!(c.register("a"), 0);
        assert_eq!(c.register("b"), 1);
        assert_eq!(c.register("a"), 0);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn indices_are_dense_in_registration_order() {
        let mut c = Collector::new();
        let ids = ["x", "y", "z", "w"];
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(c.register(*id), i);
        }
        let seen: Vec<_> = c.iter().collect();
        assert_eq!(seen, ids);
        // restartable
        let again: Vec<_> = c.iter().collect();
        assert_eq!(again, ids);
    }

    #[test]
    fn lookup_of_unregistered_identity_fails() {
        let mut c = Collector::new();
        c.register(1u32);
        assert_eq!(c.lookup(1).unwrap(), 0);
        assert!(matches!(c.lookup(2), Err(Error::UnknownResource(_))));
    }

    #[test]
    fn bundles_detect_set_changes_only() {
        let mut c = Collector::new();
        c.register("a");
        let before = c.bundle();
        c.register("a");
        assert_eq!(before, c.bundle());
        c.register("b");
        assert_ne!(before, c.bundle());
    }
}
