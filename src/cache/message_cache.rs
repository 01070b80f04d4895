//! Message Cache Module
//!
//! Read-path cache for the public message API. Three shelves share one lock:
//! full message lists (v1), paginated responses (v2), and approved counts.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::cache::{
    CacheStats, CacheStatsSnapshot, GuestbookId, ListKey, Lookup, PageKey, ShelfSizes,
    TtlLruCache,
};
use crate::error::Result;
use crate::models::Message;

// == Shelves ==
/// Everything guarded by the cache lock.
#[derive(Debug)]
struct Shelves {
    messages: TtlLruCache<GuestbookId, Vec<Message>>,
    counts: TtlLruCache<GuestbookId, u64>,
    pages: TtlLruCache<PageKey, Value>,
    /// Every page key currently stored, grouped by guestbook
    page_index: HashMap<GuestbookId, HashSet<PageKey>>,
}

impl Shelves {
    fn index_page(&mut self, key: PageKey) {
        self.page_index
            .entry(key.guestbook_id)
            .or_default()
            .insert(key);
    }

    fn unindex_page(&mut self, key: &PageKey) {
        if let Some(keys) = self.page_index.get_mut(&key.guestbook_id) {
            keys.remove(key);
            if keys.is_empty() {
                self.page_index.remove(&key.guestbook_id);
            }
        }
    }

    fn sizes(&self) -> ShelfSizes {
        ShelfSizes {
            messages: self.messages.len(),
            pages: self.pages.len(),
            counts: self.counts.len(),
        }
    }
}

// == Message Cache ==
/// TTL and LRU bounded cache in front of the message store.
///
/// Lookups take the lock shared; inserts, invalidation, and expiry removal
/// take it exclusively. Nothing here performs I/O, so the lock is never held
/// across an await point.
#[derive(Debug)]
pub struct MessageCache {
    shelves: RwLock<Shelves>,
    stats: CacheStats,
}

impl MessageCache {
    // == Constructor ==
    /// Creates three empty shelves of `capacity` entries each.
    ///
    /// # Errors
    /// `AppError::InvalidConfig` if `capacity` or `ttl` is zero. Callers treat
    /// this as fatal at startup.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        let shelves = Shelves {
            messages: TtlLruCache::new(capacity, ttl)?,
            counts: TtlLruCache::new(capacity, ttl)?,
            pages: TtlLruCache::new(capacity, ttl)?,
            page_index: HashMap::new(),
        };

        Ok(Self {
            shelves: RwLock::new(shelves),
            stats: CacheStats::new(),
        })
    }

    // == Full List ==
    /// Cached v1 message list for `guestbook_id`.
    pub fn get_messages(&self, guestbook_id: GuestbookId) -> Option<Arc<Vec<Message>>> {
        let lookup = self.shelves.read().messages.lookup(&guestbook_id);
        self.settle(lookup, &ListKey(guestbook_id), |shelves| {
            shelves.messages.remove_if_expired(&guestbook_id)
        })
    }

    pub fn set_messages(&self, guestbook_id: GuestbookId, messages: Vec<Message>) {
        let evicted = self.shelves.write().messages.insert(guestbook_id, messages);
        if let Some(evicted) = evicted {
            self.stats.record_eviction();
            debug!(key = %ListKey(evicted), "evicted least recently used list");
        }
    }

    // == Paginated ==
    /// Cached v2 response for one `(guestbook_id, page, limit)` triple.
    ///
    /// The payload is opaque to the cache.
    pub fn get_paginated_response(
        &self,
        guestbook_id: GuestbookId,
        page: u32,
        limit: u32,
    ) -> Option<Arc<Value>> {
        let key = PageKey::new(guestbook_id, page, limit);
        let lookup = self.shelves.read().pages.lookup(&key);
        self.settle(lookup, &key, |shelves| {
            let removed = shelves.pages.remove_if_expired(&key);
            if removed {
                shelves.unindex_page(&key);
            }
            removed
        })
    }

    pub fn set_paginated_response(
        &self,
        guestbook_id: GuestbookId,
        page: u32,
        limit: u32,
        response: Value,
    ) {
        let key = PageKey::new(guestbook_id, page, limit);
        let mut shelves = self.shelves.write();

        if let Some(evicted) = shelves.pages.insert(key, response) {
            shelves.unindex_page(&evicted);
            self.stats.record_eviction();
            debug!(key = %evicted, "evicted least recently used page");
        }
        shelves.index_page(key);
    }

    // == Count ==
    /// Cached approved-message count for `guestbook_id`.
    pub fn get_count(&self, guestbook_id: GuestbookId) -> Option<u64> {
        let lookup = self.shelves.read().counts.lookup(&guestbook_id);
        self.settle(lookup, &guestbook_id, |shelves| {
            shelves.counts.remove_if_expired(&guestbook_id)
        })
        .map(|count| *count)
    }

    pub fn set_count(&self, guestbook_id: GuestbookId, count: u64) {
        let evicted = self.shelves.write().counts.insert(guestbook_id, count);
        if let Some(evicted) = evicted {
            self.stats.record_eviction();
            debug!(guestbook_id = evicted, "evicted least recently used count");
        }
    }

    /// Turns a shared-lock lookup into the caller's answer.
    ///
    /// An expired entry is removed under a fresh exclusive lock. Another
    /// reader may already have removed or replaced it by then, which
    /// `expire` must tolerate.
    fn settle<V>(
        &self,
        lookup: Lookup<V>,
        key: &dyn fmt::Display,
        expire: impl FnOnce(&mut Shelves) -> bool,
    ) -> Option<Arc<V>> {
        match lookup {
            Lookup::Hit(value) => {
                self.stats.record_hit();
                debug!(key = %key, "cache hit");
                Some(value)
            }
            Lookup::Expired => {
                if expire(&mut *self.shelves.write()) {
                    self.stats.record_expirations(1);
                }
                self.stats.record_miss();
                debug!(key = %key, "cache entry expired");
                None
            }
            Lookup::Missing => {
                self.stats.record_miss();
                debug!(key = %key, "cache miss");
                None
            }
        }
    }

    // == Invalidate Guestbook ==
    /// Drops the list, the count, and every cached page of `guestbook_id`.
    ///
    /// Idempotent. Once this returns, every lookup for the guestbook misses
    /// until a handler repopulates it.
    pub fn invalidate_guestbook(&self, guestbook_id: GuestbookId) {
        let mut shelves = self.shelves.write();

        let mut removed = usize::from(shelves.messages.remove(&guestbook_id))
            + usize::from(shelves.counts.remove(&guestbook_id));
        if let Some(keys) = shelves.page_index.remove(&guestbook_id) {
            for key in keys {
                removed += usize::from(shelves.pages.remove(&key));
            }
        }
        drop(shelves);

        self.stats.record_invalidation();
        debug!(guestbook_id, removed, "invalidated guestbook cache");
    }

    // == Purge Expired ==
    /// Removes every expired entry from all shelves.
    ///
    /// Lookups already ignore expired entries; this only reclaims memory.
    pub fn purge_expired(&self) -> usize {
        let mut shelves = self.shelves.write();

        let mut removed = shelves.messages.purge_expired().len();
        removed += shelves.counts.purge_expired().len();
        for key in shelves.pages.purge_expired() {
            shelves.unindex_page(&key);
            removed += 1;
        }
        drop(shelves);

        self.stats.record_expirations(removed as u64);
        removed
    }

    // == Clear ==
    /// Empties every shelf and resets the statistics.
    pub fn clear(&self) {
        let mut shelves = self.shelves.write();
        shelves.messages.clear();
        shelves.counts.clear();
        shelves.pages.clear();
        shelves.page_index.clear();
        drop(shelves);

        self.stats.reset();
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStatsSnapshot {
        let sizes = self.shelves.read().sizes();
        self.stats.snapshot(sizes)
    }

    /// Total entries over all shelves, expired ones included until removed.
    pub fn len(&self) -> usize {
        let sizes = self.shelves.read().sizes();
        sizes.messages + sizes.pages + sizes.counts
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::thread::sleep;

    fn cache() -> MessageCache {
        MessageCache::new(100, Duration::from_secs(300)).unwrap()
    }

    fn message(id: u64, guestbook_id: GuestbookId) -> Message {
        let now = Utc::now();
        Message {
            id,
            created_at: now,
            updated_at: now,
            name: format!("visitor {id}"),
            text: "hi".into(),
            website: None,
            approved: true,
            guestbook_id,
            parent_message_id: None,
            replies: Vec::new(),
            author_admin_id: None,
        }
    }

    fn indexed_pages(cache: &MessageCache, guestbook_id: GuestbookId) -> usize {
        cache
            .shelves
            .read()
            .page_index
            .get(&guestbook_id)
            .map_or(0, HashSet::len)
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        assert!(MessageCache::new(0, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_messages_roundtrip() {
        let cache = cache();
        assert!(cache.get_messages(1).is_none());

        cache.set_messages(1, vec![message(10, 1)]);

        let cached = cache.get_messages(1).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, 10);
    }

    #[test]
    fn test_count_and_page_roundtrip() {
        let cache = cache();
        cache.set_count(1, 42);
        cache.set_paginated_response(1, 2, 20, json!({"page": 2}));

        assert_eq!(cache.get_count(1), Some(42));
        assert_eq!(
            cache.get_paginated_response(1, 2, 20).as_deref(),
            Some(&json!({"page": 2}))
        );
        assert!(cache.get_paginated_response(1, 2, 10).is_none());
    }

    #[test]
    fn test_invalidate_removes_every_shape() {
        let cache = cache();
        cache.set_messages(1, vec![message(1, 1)]);
        cache.set_count(1, 1);
        for (page, limit) in [(1, 20), (2, 20), (1, 50), (3, 5)] {
            cache.set_paginated_response(1, page, limit, json!({}));
        }
        cache.set_messages(2, vec![message(2, 2)]);
        cache.set_count(2, 1);
        cache.set_paginated_response(2, 1, 20, json!({}));

        cache.invalidate_guestbook(1);

        assert!(cache.get_messages(1).is_none());
        assert!(cache.get_count(1).is_none());
        for (page, limit) in [(1, 20), (2, 20), (1, 50), (3, 5)] {
            assert!(cache.get_paginated_response(1, page, limit).is_none());
        }
        assert_eq!(indexed_pages(&cache, 1), 0);

        assert!(cache.get_messages(2).is_some());
        assert_eq!(cache.get_count(2), Some(1));
        assert!(cache.get_paginated_response(2, 1, 20).is_some());
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let cache = cache();
        cache.set_messages(1, Vec::new());

        cache.invalidate_guestbook(1);
        cache.invalidate_guestbook(1);
        cache.invalidate_guestbook(99);

        assert!(cache.get_messages(1).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 3);
    }

    #[test]
    fn test_expired_entries_are_removed_on_read() {
        let cache = MessageCache::new(10, Duration::from_millis(30)).unwrap();
        cache.set_messages(1, Vec::new());
        cache.set_count(1, 3);
        cache.set_paginated_response(1, 1, 20, json!({}));
        assert_eq!(cache.len(), 3);

        sleep(Duration::from_millis(60));

        assert!(cache.get_messages(1).is_none());
        assert!(cache.get_count(1).is_none());
        assert!(cache.get_paginated_response(1, 1, 20).is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(indexed_pages(&cache, 1), 0);

        let stats = cache.stats();
        assert_eq!(stats.expirations, 3);
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_page_eviction_updates_index() {
        let cache = MessageCache::new(2, Duration::from_secs(60)).unwrap();
        cache.set_paginated_response(1, 1, 20, json!(1));
        cache.set_paginated_response(1, 2, 20, json!(2));
        cache.set_paginated_response(2, 1, 20, json!(3));

        assert_eq!(indexed_pages(&cache, 1), 1);
        assert_eq!(indexed_pages(&cache, 2), 1);
        assert!(cache.get_paginated_response(1, 1, 20).is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_lru_example_scenario() {
        let cache = MessageCache::new(2, Duration::from_secs(5)).unwrap();
        cache.set_messages(1, vec![message(1, 1)]);
        cache.set_messages(2, vec![message(2, 2)]);
        assert!(cache.get_messages(1).is_some());
        cache.set_messages(3, vec![message(3, 3)]);

        assert!(cache.get_messages(2).is_none());
        assert!(cache.get_messages(1).is_some());
        assert!(cache.get_messages(3).is_some());
    }

    #[test]
    fn test_purge_expired() {
        let cache = MessageCache::new(10, Duration::from_millis(30)).unwrap();
        cache.set_messages(1, Vec::new());
        cache.set_paginated_response(1, 1, 20, json!({}));

        sleep(Duration::from_millis(60));
        cache.set_count(2, 5);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(indexed_pages(&cache, 1), 0);
        assert_eq!(cache.get_count(2), Some(5));
    }

    #[test]
    fn test_clear() {
        let cache = cache();
        cache.set_messages(1, Vec::new());
        cache.set_count(1, 1);
        cache.set_paginated_response(1, 1, 20, json!({}));
        let _ = cache.get_messages(1);

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(indexed_pages(&cache, 1), 0);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = cache();
        let _ = cache.get_messages(1);
        cache.set_messages(1, Vec::new());
        let _ = cache.get_messages(1);
        let _ = cache.get_messages(1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries.messages, 1);
    }
}
