//! A small fixed-capacity LRU map shared by the three caches in this crate.
//!
//! Capacities here are small (at most 1,000 entries), so recency is tracked
//! with a plain `Vec` scanned linearly rather than an intrusive linked
//! list — simpler, and fast enough at this scale.

use rustc_hash::FxHashMap;
use std::hash::Hash;

pub struct LruMap<K, V> {
    capacity: usize,
    entries: FxHashMap<K, V>,
    /// Most-recently-used key is last.
    order: Vec<K>,
}

impl<K: Eq + Hash + Clone, V> LruMap<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruMap { capacity, entries: FxHashMap::default(), order: Vec::new() }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.entries.contains_key(key) {
            self.touch(key);
            self.entries.get(key)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), value);
            self.touch(&key);
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.order.push(key.clone());
        self.entries.insert(key, value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fraction of capacity currently filled, in `[0, 1]`
    /// ("if expression memo exceeds 50% fill, clear it").
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.entries.len() as f64 / self.capacity as f64
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos);
            self.order.push(k);
        }
    }

    fn evict_oldest(&mut self) {
        if !self.order.is_empty() {
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_drops_least_recently_used() {
        let mut cache: LruMap<u32, &str> = LruMap::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.get(&1);
        cache.insert(3, "c");
        assert!(cache.get(&2).is_none());
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&3).is_some());
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache: LruMap<u32, &str> = LruMap::new(4);
        cache.insert(1, "a");
        cache.clear();
        assert!(cache.is_empty());
    }
}
