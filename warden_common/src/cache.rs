use std::{hash::Hash, num::NonZeroUsize, sync::Mutex};

use lru::LruCache;

/// A small bounded LRU cache behind a mutex, shared between event tasks.
pub struct Cache<K, V> {
    entries: Mutex<LruCache<K, V>>,
}

impl<K: Eq + Hash, V: Clone> Cache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be non-zero"),
            )),
        }
    }

    pub fn get_cloned(&self, key: &K) -> Option<V> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Inserts an entry, returning the previous value if the key was present.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.entries.lock().unwrap().put(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().unwrap().pop(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().unwrap().contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = Cache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");

        assert!(!cache.contains(&1));
        assert_eq!(cache.get_cloned(&2), Some("b"));
        assert_eq!(cache.get_cloned(&3), Some("c"));
    }

    #[test]
    fn insert_replaces_and_returns_old_value() {
        let cache = Cache::new(4);
        assert_eq!(cache.insert(7, "old"), None);
        assert_eq!(cache.insert(7, "new"), Some("old"));
        assert_eq!(cache.get_cloned(&7), Some("new"));
    }
}
