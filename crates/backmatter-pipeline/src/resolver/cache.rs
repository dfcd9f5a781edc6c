//! Bounded record cache

use super::EntityRecord;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Default number of records kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Map from PMB id to resolved record with a fixed capacity.
///
/// When full, the entry inserted first is evicted, regardless of how often
/// it was read. Re-inserting an id replaces its value and keeps its age.
#[derive(Debug)]
pub struct RecordCache {
    entries: HashMap<String, Arc<EntityRecord>>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    capacity: usize,
}

impl RecordCache {
    /// A capacity of zero disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
            order: VecDeque::new(),
            capacity,
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<EntityRecord>> {
        self.entries.get(id).cloned()
    }

    pub fn insert(&mut self, id: String, record: Arc<EntityRecord>) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.entries.get_mut(&id) {
            *existing = record;
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(id.clone());
        self.entries.insert(id, record);
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::RecordSource;
    use backmatter_core::{EntityKind, TeiDocument};
    use proptest::prelude::*;

    fn record(id: &str) -> Arc<EntityRecord> {
        Arc::new(EntityRecord {
            id: id.to_string(),
            kind: EntityKind::Place,
            source: RecordSource::Local,
            fragment: TeiDocument::new("place"),
        })
    }

    #[test]
    fn test_oldest_insert_is_evicted_first() {
        let mut cache = RecordCache::default();
        for i in 0..=DEFAULT_CACHE_CAPACITY {
            cache.insert(format!("pmb{i}"), record(&format!("pmb{i}")));
        }
        assert_eq!(cache.len(), DEFAULT_CACHE_CAPACITY);
        assert!(!cache.contains("pmb0"));
        assert!(cache.contains("pmb1"));
        assert!(cache.contains(&format!("pmb{DEFAULT_CACHE_CAPACITY}")));
    }

    #[test]
    fn test_reads_do_not_refresh_age() {
        let mut cache = RecordCache::new(2);
        cache.insert("a".into(), record("a"));
        cache.insert("b".into(), record("b"));
        assert!(cache.get("a").is_some());
        cache.insert("c".into(), record("c"));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_reinsert_keeps_age() {
        let mut cache = RecordCache::new(2);
        cache.insert("a".into(), record("a"));
        cache.insert("b".into(), record("b"));
        cache.insert("a".into(), record("a"));
        cache.insert("c".into(), record("c"));
        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = RecordCache::new(0);
        cache.insert("a".into(), record("a"));
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn prop_keeps_most_recent_inserts(capacity in 1usize..16, count in 0usize..64) {
            let mut cache = RecordCache::new(capacity);
            for i in 0..count {
                cache.insert(i.to_string(), record(&i.to_string()));
            }
            prop_assert_eq!(cache.len(), count.min(capacity));
            for i in 0..count {
                prop_assert_eq!(cache.contains(&i.to_string()), i + capacity >= count);
            }
        }
    }
}
