//! Cache Entry Module
//!
//! Defines the immutable entry stored in each sub-cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// == Cache Entry ==
/// A cached payload with its creation time and recency stamp.
///
/// The payload is never mutated after insertion; a refresh replaces the whole
/// entry. Only the recency stamp changes, and it is atomic so a hit can be
/// recorded while the owning map is shared between readers.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored payload
    value: Arc<V>,
    /// When the entry was stored
    created_at: Instant,
    /// Logical clock value of the last insert or hit
    last_used: AtomicU64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current instant.
    pub fn new(value: V, stamp: u64) -> Self {
        Self::created(value, Instant::now(), stamp)
    }

    pub(crate) fn created(value: V, created_at: Instant, stamp: u64) -> Self {
        Self {
            value: Arc::new(value),
            created_at,
            last_used: AtomicU64::new(stamp),
        }
    }

    /// Returns a shared handle to the payload.
    pub fn value(&self) -> Arc<V> {
        Arc::clone(&self.value)
    }

    /// Time elapsed since the entry was stored.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    // == Is Expired ==
    /// Checks whether the entry has outlived `ttl`.
    ///
    /// An entry is still valid when its age equals the TTL exactly; it
    /// expires once the age is strictly greater.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    // == Touch ==
    /// Records a use at logical time `stamp`.
    ///
    /// Concurrent readers may touch out of order, so the stamp only moves
    /// forward.
    pub fn touch(&self, stamp: u64) {
        self.last_used.fetch_max(stamp, Ordering::Relaxed);
    }

    /// Logical time of the most recent use.
    pub fn last_used(&self) -> u64 {
        self.last_used.load(Ordering::Relaxed)
    }
}
