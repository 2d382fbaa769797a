//! Metrics hooks and TTL policy for cached reads.

use std::collections::HashMap;
use std::time::Duration;

/// Hooks invoked by [`CacheExpander`](crate::CacheExpander) after each
/// operation. Implement to forward to a metrics system.
pub trait CacheMetrics: Send + Sync {
    fn record_hit(&self, key: &str, duration: Duration);

    fn record_miss(&self, key: &str, duration: Duration);

    fn record_error(&self, key: &str, error: &str) {
        let _ = (key, error);
    }
}

/// Metrics sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}

    fn record_miss(&self, _key: &str, _duration: Duration) {}
}

/// Decides the expiry attached to a cache write.
#[derive(Clone, Debug, Default)]
pub enum TtlPolicy {
    /// No expiry; the backend keeps the entry until evicted or deleted.
    #[default]
    Default,
    /// Same TTL for every entity type.
    Fixed(Duration),
    /// TTL looked up by entity prefix; unknown prefixes get no expiry.
    PerType(HashMap<&'static str, Duration>),
}

impl TtlPolicy {
    /// TTL for entities with the given cache prefix.
    pub fn get_ttl(&self, prefix: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Default => None,
            TtlPolicy::Fixed(ttl) => Some(*ttl),
            TtlPolicy::PerType(map) => map.get(prefix).copied(),
        }
    }
}
