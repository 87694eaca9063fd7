//! Bounded least-recently-used cache with per-entry time-to-live.
//!
//! Callers pass `now` explicitly; the cache never reads the clock itself.

use std::hash::Hash;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
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

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: FxHashMap<K, Entry<V>>,
    tick: u64,
    stats: CacheStats,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// `capacity` is raised to at least one entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: FxHashMap::default(),
            tick: 0,
            stats: CacheStats::default(),
        }
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

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    fn is_expired(&self, inserted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted_at) >= self.ttl
    }

    #[inline]
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn get(&mut self, key: &K, now: Instant) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => self.is_expired(entry.inserted_at, now),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.stats.misses += 1;
            return None;
        }

        let tick = self.next_tick();
        self.stats.hits += 1;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            &entry.value
        })
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.purge_expired(now);
            while self.entries.len() >= self.capacity {
                if !self.evict_lru() {
                    break;
                }
            }
        }

        let tick = self.next_tick();
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                last_used: tick,
            },
        );
    }

    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        now: Instant,
        f: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E>
    where
        V: Clone,
    {
        if let Some(value) = self.get(&key, now) {
            return Ok(value.clone());
        }

        let value = f()?;
        self.insert(key, value.clone(), now);
        Ok(value)
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);
        let removed = before - self.entries.len();
        self.stats.evictions += removed as u64;
        removed
    }

    fn evict_lru(&mut self) -> bool {
        let Some(oldest) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        else {
            return false;
        };

        self.entries.remove(&oldest);
        self.stats.evictions += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn evicts_least_recently_used() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(2, TTL);
        cache.insert("a", 1, t0);
        cache.insert("b", 2, t0);
        assert_eq!(cache.get(&"a", t0), Some(&1));

        cache.insert("c", 3, t0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"b", t0), None);
        assert_eq!(cache.get(&"a", t0), Some(&1));
        assert_eq!(cache.get(&"c", t0), Some(&3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn entries_expire() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(4, TTL);
        cache.insert(1u32, "x", t0);
        assert_eq!(cache.get(&1, t0 + Duration::from_secs(59)), Some(&"x"));
        assert_eq!(cache.get(&1, t0 + TTL), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entries_go_before_live_ones() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(90);
        let mut cache = TtlCache::new(2, TTL);
        cache.insert("old", 1, t0);
        cache.insert("fresh", 2, t0 + Duration::from_secs(50));
        cache.get(&"old", t0);

        cache.insert("new", 3, later);
        assert_eq!(cache.get(&"fresh", later), Some(&2));
        assert_eq!(cache.get(&"new", later), Some(&3));
    }

    #[test]
    fn try_insert_computes_once() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(2, TTL);
        let mut calls = 0;
        for _ in 0..3 {
            let v: Result<u32, ()> = cache.get_or_try_insert_with(7, t0, || {
                calls += 1;
                Ok(42)
            });
            assert_eq!(v, Ok(42));
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.stats().hits, 2);
        assert!((cache.stats().hit_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn failed_insert_is_not_cached() {
        let t0 = Instant::now();
        let mut cache: TtlCache<u8, u8> = TtlCache::new(2, TTL);
        assert_eq!(cache.get_or_try_insert_with(1, t0, || Err("boom")), Err("boom"));
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(0, TTL);
        cache.insert(1, 1, t0);
        cache.insert(2, 2, t0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2, t0), Some(&2));
    }
}
