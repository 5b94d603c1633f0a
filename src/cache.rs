// src/cache.rs
//
// Bounded LRU store of the last committed result per track identity.
// This is the one component shared across threads: the orchestrator
// writes while a reporting/display thread reads, so every method takes
// the internal lock and values are copied in and out.

use crate::lifecycle::LabelResults;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<u64, LabelResults>,
    /// Recency order, least recently used at the front.
    order: VecDeque<u64>,
    hits: u64,
    misses: u64,
}

impl CacheInner {
    fn touch(&mut self, track_id: u64) {
        self.order.retain(|id| *id != track_id);
        self.order.push_back(track_id);
    }
}

pub struct ClassificationCache {
    max_size: usize,
    inner: Mutex<CacheInner>,
}

impl ClassificationCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A poisoned lock means a reader panicked mid-call; no operation
        // leaves the maps inconsistent, so recovering is safe.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the stored result, refreshing recency. A missing key is a
    /// normal miss, not an error.
    pub fn get(&self, track_id: u64) -> Option<LabelResults> {
        let mut inner = self.lock();
        if let Some(results) = inner.entries.get(&track_id).cloned() {
            inner.touch(track_id);
            inner.hits += 1;
            Some(results)
        } else {
            inner.misses += 1;
            None
        }
    }

    /// Store a copy, evicting the least recently used entry if the insert
    /// would exceed capacity.
    pub fn put(&self, track_id: u64, results: &LabelResults) {
        let mut inner = self.lock();
        if inner.entries.insert(track_id, results.clone()).is_some() {
            inner.touch(track_id);
            return;
        }

        inner.order.push_back(track_id);
        if inner.entries.len() > self.max_size {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn remove(&self, track_id: u64) -> bool {
        let mut inner = self.lock();
        if inner.entries.remove(&track_id).is_some() {
            inner.order.retain(|id| *id != track_id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, track_id: u64) -> bool {
        self.lock().entries.contains_key(&track_id)
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().entries.len() >= self.max_size
    }

    /// Cached identities, least recently used first.
    pub fn ids(&self) -> Vec<u64> {
        self.lock().order.iter().copied().collect()
    }

    pub fn oldest_id(&self) -> Option<u64> {
        self.lock().order.front().copied()
    }

    pub fn newest_id(&self) -> Option<u64> {
        self.lock().order.back().copied()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
            max_size: self.max_size,
        }
    }

    pub fn reset_stats(&self) {
        let mut inner = self.lock();
        inner.hits = 0;
        inner.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn results(pairs: &[(&str, &str)]) -> LabelResults {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_round_trip_returns_copy() {
        let cache = ClassificationCache::new(10);
        let original = results(&[("brand", "Aqua"), ("cap", "with_cap")]);
        cache.put(1, &original);

        let mut fetched = cache.get(1).unwrap();
        assert_eq!(fetched, original);

        // Mutating the fetched copy must not corrupt the cached value.
        fetched.insert("brand".to_string(), "Vit".to_string());
        assert_eq!(cache.get(1).unwrap(), original);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = ClassificationCache::new(2);
        cache.put(1, &results(&[("brand", "A")]));
        cache.put(2, &results(&[("brand", "B")]));
        cache.put(3, &results(&[("brand", "C")]));

        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ClassificationCache::new(2);
        cache.put(1, &results(&[("brand", "A")]));
        cache.put(2, &results(&[("brand", "B")]));

        // Touch 1 so that 2 becomes the eviction candidate.
        cache.get(1);
        cache.put(3, &results(&[("brand", "C")]));

        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none());
    }

    #[test]
    fn test_put_existing_refreshes_without_evicting() {
        let cache = ClassificationCache::new(2);
        cache.put(1, &results(&[("brand", "A")]));
        cache.put(2, &results(&[("brand", "B")]));
        cache.put(1, &results(&[("brand", "A2")]));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.oldest_id(), Some(2));
        assert_eq!(cache.newest_id(), Some(1));
        assert_eq!(cache.get(1).unwrap()["brand"], "A2");
    }

    #[test]
    fn test_hit_rate() {
        let cache = ClassificationCache::new(10);
        assert_eq!(cache.stats().hit_rate(), 0.0);

        cache.put(1, &results(&[("brand", "A")]));
        cache.get(1);
        cache.get(2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_remove_and_contains() {
        let cache = ClassificationCache::new(10);
        cache.put(7, &results(&[("brand", "A")]));

        assert!(cache.contains(7));
        assert!(cache.remove(7));
        assert!(!cache.contains(7));
        assert!(!cache.remove(7));
    }

    #[test]
    fn test_clear() {
        let cache = ClassificationCache::new(10);
        cache.put(1, &results(&[("brand", "A")]));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.ids(), Vec::<u64>::new());
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let cache = Arc::new(ClassificationCache::new(50));
        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..500u64 {
                    cache.put(i % 60, &results(&[("brand", "A")]));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..500u64 {
                        let _ = cache.get(i % 60);
                        let _ = cache.stats();
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert!(cache.len() <= 50);
    }
}
