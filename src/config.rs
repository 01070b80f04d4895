//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CACHE_CAPACITY: usize = 1000;
const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_SERVER_PORT: u16 = 6235;
const DEFAULT_CLEANUP_INTERVAL: u64 = 60;

/// Server configuration parameters.
///
/// Zero capacity or TTL is passed through unchanged; the cache rejects it at
/// startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Entry bound of each sub-cache
    pub cache_capacity: usize,
    /// Lifetime of a cached entry, in seconds
    pub cache_ttl_secs: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Entries per sub-cache (default: 1000)
    /// - `CACHE_TTL` - Entry lifetime in seconds (default: 600)
    /// - `SERVER_PORT` - HTTP server port (default: 6235)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        Self {
            cache_capacity: env_or("CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY),
            cache_ttl_secs: env_or("CACHE_TTL", DEFAULT_CACHE_TTL_SECS),
            server_port: env_or("SERVER_PORT", DEFAULT_SERVER_PORT),
            cleanup_interval: env_or("CLEANUP_INTERVAL", DEFAULT_CLEANUP_INTERVAL),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            server_port: DEFAULT_SERVER_PORT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Reads `name`, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
