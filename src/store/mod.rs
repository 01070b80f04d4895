//! Persistence layer
//!
//! The store is the source of truth; it knows nothing about the cache.

mod memory;

pub use memory::{GuestbookSettings, MemoryStore, MessageUpdate, NewGuestbook, NewMessage};
