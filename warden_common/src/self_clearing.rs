use std::{
    collections::HashMap,
    hash::Hash,
    sync::Mutex,
    time::{Duration, Instant},
};

/// A map whose entries expire after a fixed duration.
///
/// Expired entries are swept lazily on every access instead of by a
/// background task, so the map never outlives its owner's event loop.
pub struct SelfClearingMap<K, V> {
    duration: Duration,
    entries: Mutex<HashMap<K, (V, Instant)>>,
}

impl<K: Eq + Hash + Clone, V: Clone> SelfClearingMap<K, V> {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn sweep(&self, entries: &mut HashMap<K, (V, Instant)>) {
        let duration = self.duration;
        entries.retain(|_, (_, inserted_at)| inserted_at.elapsed() < duration);
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap();
        self.sweep(&mut entries);
        entries.insert(key, (value, Instant::now()));
    }

    pub fn get_cloned(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        self.sweep(&mut entries);
        entries.get(key).map(|(value, _)| value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get_cloned(key).is_some()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        self.sweep(&mut entries);
        entries.remove(key).map(|(value, _)| value)
    }

    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        self.sweep(&mut entries);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_fresh_entries() {
        let map = SelfClearingMap::new(Duration::from_secs(60));
        map.insert("a", 1);
        map.insert("b", 2);

        assert_eq!(map.get_cloned(&"a"), Some(1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn sweeps_expired_entries() {
        let map = SelfClearingMap::new(Duration::ZERO);
        map.insert("a", 1);

        assert_eq!(map.get_cloned(&"a"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn remove_returns_value() {
        let map = SelfClearingMap::new(Duration::from_secs(60));
        map.insert("a", 1);

        assert_eq!(map.remove(&"a"), Some(1));
        assert_eq!(map.remove(&"a"), None);
    }
}
