//! Cache backend abstraction and implementations.
//!
//! A backend stores opaque byte values under string keys with an optional
//! TTL. Backends that can report keyspace counters also implement
//! [`StatsSource`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

#[cfg(feature = "inmemory")]
mod inmemory;
#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::RedisBackend;

/// Default Redis connection pool size.
/// Formula: (CPU cores × 2) + 1
/// Override with REDIS_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: u32 = 16;

/// Configuration for the Redis backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// e.g. `redis://127.0.0.1:6379/1`
    pub url: String,
    pub pool_size: u32,
    /// Applies to both connection creation and waiting for a free slot.
    pub connection_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            url: "redis://127.0.0.1:6379/1".to_string(),
            pool_size: std::env::var("REDIS_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_POOL_SIZE),
            connection_timeout_secs: 5,
        }
    }
}

/// Key-value store used for both listing data and cached pages.
///
/// Handles are cheap to clone and share one underlying store.
pub trait CacheBackend: Clone + Send + Sync + 'static {
    /// Fetch the value stored under `key`, `None` on miss or expiry.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store `value` under `key`, expiring after `ttl` when given.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// `Ok(true)` when the backend answers.
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send;
}

/// Cumulative lookup counters kept by a cache server since its start or
/// last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyspaceStats {
    pub hits: u64,
    pub misses: u64,
}

impl KeyspaceStats {
    /// Extract counters from `INFO`-style fields. Absent counters read as 0.
    pub fn from_info(info: &HashMap<String, String>) -> Result<Self> {
        Ok(KeyspaceStats {
            hits: counter(info, "keyspace_hits")?,
            misses: counter(info, "keyspace_misses")?,
        })
    }
}

fn counter(info: &HashMap<String, String>, field: &str) -> Result<u64> {
    match info.get(field) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::BackendError(format!("Invalid value for {}: {:?}", field, raw))
        }),
        None => Ok(0),
    }
}

/// Parse the text reply of the `INFO` command into `field -> value`.
///
/// Section headers (`# Stats`) and blank lines are skipped.
pub fn parse_info(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

/// Source of keyspace hit/miss counters.
pub trait StatsSource: Send + Sync {
    fn keyspace_stats(&self) -> impl Future<Output = Result<KeyspaceStats>> + Send;
}
