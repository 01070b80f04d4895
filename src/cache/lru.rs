//! TTL/LRU Container Module
//!
//! Implements the bounded, time-limited map backing each sub-cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheEntry;
use crate::error::{AppError, Result};

// == Lookup Result ==
/// Outcome of a shared-access lookup.
#[derive(Debug)]
pub enum Lookup<V> {
    /// Live entry; recency has been refreshed
    Hit(Arc<V>),
    /// Entry present but past its TTL; caller must remove it exclusively
    Expired,
    /// No entry under this key
    Missing,
}

// == TTL LRU Cache ==
/// Bounded key/entry map with least-recently-used eviction and a uniform TTL.
///
/// Recency is a logical clock: every insert and hit takes the next tick and
/// stamps it on the entry. The entry with the smallest stamp is the least
/// recently used. Eviction scans for that minimum, which keeps lookups
/// lock-free with respect to ordering at the cost of an O(n) insert when
/// the container is full.
#[derive(Debug)]
pub struct TtlLruCache<K, V> {
    /// Key-entry storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Logical recency clock
    clock: AtomicU64,
    /// Maximum number of entries
    capacity: usize,
    /// Lifetime of every entry
    ttl: Duration,
}

impl<K, V> TtlLruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty container.
    ///
    /// # Errors
    /// `AppError::InvalidConfig` if `capacity` is zero or `ttl` is zero.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(AppError::InvalidConfig(
                "cache capacity must be greater than zero".to_string(),
            ));
        }
        if ttl.is_zero() {
            return Err(AppError::InvalidConfig(
                "cache TTL must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            entries: HashMap::with_capacity(capacity),
            clock: AtomicU64::new(0),
            capacity,
            ttl,
        })
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    // == Lookup ==
    /// Looks up `key` without exclusive access.
    ///
    /// A live entry is marked as used. An expired entry is reported but left
    /// in place; it never counts as a hit.
    pub fn lookup(&self, key: &K) -> Lookup<V> {
        match self.entries.get(key) {
            None => Lookup::Missing,
            Some(entry) if entry.is_expired(self.ttl) => Lookup::Expired,
            Some(entry) => {
                entry.touch(self.tick());
                Lookup::Hit(entry.value())
            }
        }
    }

    // == Remove If Expired ==
    /// Removes `key` only if it is still present and still expired.
    ///
    /// Two readers can both observe the same expired entry; whichever gets
    /// exclusive access second finds it gone (or replaced by a fresh entry)
    /// and does nothing.
    pub fn remove_if_expired(&mut self, key: &K) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(self.ttl));
        if expired {
            self.entries.remove(key);
        }
        expired
    }

    // == Insert ==
    /// Inserts or replaces `key` with a freshly timestamped entry.
    ///
    /// Returns the evicted key when a new key pushed the container past
    /// capacity. Replacing an existing key never evicts.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        let evicted = if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        let stamp = self.tick();
        self.entries.insert(key, CacheEntry::new(value, stamp));
        evicted
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used())
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&oldest);
        Some(oldest)
    }

    // == Remove ==
    /// Removes `key`; returns false if it was already absent.
    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Purge Expired ==
    /// Removes every expired entry and returns their keys.
    pub fn purge_expired(&mut self) -> Vec<K> {
        let ttl = self.ttl;
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until removed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn cache(capacity: usize) -> TtlLruCache<u64, &'static str> {
        TtlLruCache::new(capacity, Duration::from_secs(5)).unwrap()
    }

    fn is_hit<V>(lookup: Lookup<V>) -> bool {
        matches!(lookup, Lookup::Hit(_))
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = TtlLruCache::<u64, u64>::new(0, Duration::from_secs(1));
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let result = TtlLruCache::<u64, u64>::new(10, Duration::ZERO);
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut lru = cache(10);
        assert!(lru.insert(1, "a").is_none());

        match lru.lookup(&1) {
            Lookup::Hit(value) => assert_eq!(*value, "a"),
            other => panic!("expected hit, got {other:?}"),
        }
        assert!(matches!(lru.lookup(&2), Lookup::Missing));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        // capacity=2: Set(1), Set(2), Get(1), Set(3) evicts 2
        let mut lru = cache(2);
        lru.insert(1, "a");
        lru.insert(2, "b");
        assert!(is_hit(lru.lookup(&1)));

        let evicted = lru.insert(3, "c");

        assert_eq!(evicted, Some(2));
        assert!(matches!(lru.lookup(&2), Lookup::Missing));
        assert!(is_hit(lru.lookup(&1)));
        assert!(is_hit(lru.lookup(&3)));
    }

    #[test]
    fn test_evicts_insertion_order_without_reads() {
        let mut lru = cache(3);
        lru.insert(1, "a");
        lru.insert(2, "b");
        lru.insert(3, "c");

        assert_eq!(lru.insert(4, "d"), Some(1));
        assert_eq!(lru.insert(5, "e"), Some(2));
        assert_eq!(lru.len(), 3);
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut lru = cache(2);
        lru.insert(1, "a");
        lru.insert(2, "b");

        assert!(lru.insert(1, "a2").is_none());
        assert_eq!(lru.len(), 2);
        match lru.lookup(&1) {
            Lookup::Hit(value) => assert_eq!(*value, "a2"),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn test_replace_refreshes_recency() {
        let mut lru = cache(2);
        lru.insert(1, "a");
        lru.insert(2, "b");
        lru.insert(1, "a2");

        assert_eq!(lru.insert(3, "c"), Some(2));
    }

    #[test]
    fn test_expired_lookup_and_removal() {
        let mut lru = TtlLruCache::new(4, Duration::from_millis(20)).unwrap();
        lru.insert(1_u64, "a");

        sleep(Duration::from_millis(50));

        assert!(matches!(lru.lookup(&1), Lookup::Expired));
        assert!(lru.remove_if_expired(&1));
        assert!(!lru.remove_if_expired(&1), "Second removal must be a no-op");
        assert!(lru.is_empty());
    }

    #[test]
    fn test_remove_if_expired_keeps_fresh_entry() {
        let mut lru = cache(4);
        lru.insert(1, "a");

        assert!(!lru.remove_if_expired(&1));
        assert!(is_hit(lru.lookup(&1)));
    }

    #[test]
    fn test_remove_absent_key() {
        let mut lru = cache(4);
        assert!(!lru.remove(&7));
        lru.insert(7, "x");
        assert!(lru.remove(&7));
        assert!(!lru.remove(&7));
    }

    #[test]
    fn test_purge_expired() {
        let mut lru = TtlLruCache::new(4, Duration::from_millis(20)).unwrap();
        lru.insert(1_u64, "a");
        lru.insert(2, "b");

        sleep(Duration::from_millis(50));
        lru.insert(3, "c");

        let mut purged = lru.purge_expired();
        purged.sort_unstable();

        assert_eq!(purged, vec![1, 2]);
        assert_eq!(lru.len(), 1);
        assert!(is_hit(lru.lookup(&3)));
    }

    #[test]
    fn test_clear() {
        let mut lru = cache(4);
        lru.insert(1, "a");
        lru.insert(2, "b");
        lru.clear();

        assert!(lru.is_empty());
        assert!(matches!(lru.lookup(&1), Lookup::Missing));
    }
}
