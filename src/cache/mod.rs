//! Cache Module
//!
//! Provides the in-memory message cache with TTL expiration and LRU eviction.

mod entry;
mod keys;
mod lru;
mod message_cache;
mod stats;


// Re-export public types
pub use entry::CacheEntry;
pub use keys::{GuestbookId, ListKey, PageKey};
pub use lru::{Lookup, TtlLruCache};
pub use message_cache::MessageCache;
pub use stats::{CacheStats, CacheStatsSnapshot, ShelfSizes};
