//! Guestbook Cache - multi-tenant guestbook read API
//!
//! Serves approved guestbook messages through a TTL and LRU bounded cache
//! that every write path invalidates per guestbook.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::MessageCache;
pub use config::Config;
pub use error::{AppError, Result};
pub use store::MemoryStore;
pub use tasks::spawn_cleanup_task;
