//! In-memory cache for storing key-value pairs.
//!
//! Uses moka's concurrent cache implementation.

use std::sync::Arc;

use moka::sync::Cache;

/// Thread-safe in-memory cache with configurable capacity.
///
/// Backs the in-memory workflow store. Entries beyond capacity are evicted
/// by moka's admission policy.
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Allocate a new [`MemCache`].
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Cache::new(capacity as u64),
        }
    }

    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    pub fn contains(
        &self,
        key: &K,
    ) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes the entry, returning its value.
    pub fn remove(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.remove(key)
    }

    /// All values currently cached, in no particular order.
    pub fn values(&self) -> Vec<V> {
        self.entries.iter().map(|(_, v): (Arc<K>, V)| v).collect()
    }
}

#[cfg(test)]
mod test {
    use super::MemCache;

    #[test]
    fn test_set_get_remove() {
        let cache: MemCache<String, i32> = MemCache::new(16);
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert!(cache.contains(&"a".to_string()));
        assert_eq!(cache.values(), vec![1]);
        assert_eq!(cache.remove(&"a".to_string()), Some(1));
        assert!(cache.get(&"a".to_string()).is_none());
    }
}
