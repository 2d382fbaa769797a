//! Keyspace hit/miss metrics read from the cache server.

use crate::backend::{KeyspaceStats, StatsSource};
use serde::Serialize;
use std::fmt;

/// Derived view of the server's cumulative lookup counters.
///
/// `hit_ratio + miss_ratio == 1` whenever `total > 0`; both ratios are `0`
/// when there has been no lookup at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
    pub hit_ratio: f64,
    pub miss_ratio: f64,
}

impl MetricsSnapshot {
    pub fn from_counts(hits: u64, misses: u64) -> Self {
        let total = hits.saturating_add(misses);
        let (hit_ratio, miss_ratio) = if total > 0 {
            let hit_ratio = hits as f64 / total as f64;
            (hit_ratio, 1.0 - hit_ratio)
        } else {
            (0.0, 0.0)
        };

        MetricsSnapshot {
            hits,
            misses,
            total,
            hit_ratio,
            miss_ratio,
        }
    }
}

impl From<KeyspaceStats> for MetricsSnapshot {
    fn from(stats: KeyspaceStats) -> Self {
        MetricsSnapshot::from_counts(stats.hits, stats.misses)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} total={} hit_ratio={:.4} miss_ratio={:.4}",
            self.hits, self.misses, self.total, self.hit_ratio, self.miss_ratio
        )
    }
}

/// Outcome of a metrics query.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricsReport {
    Success(MetricsSnapshot),
    /// The server could not be reached or queried. The snapshot is all
    /// zeros.
    Failure {
        reason: String,
        snapshot: MetricsSnapshot,
    },
}

impl MetricsReport {
    pub fn failure(reason: impl Into<String>) -> Self {
        MetricsReport::Failure {
            reason: reason.into(),
            snapshot: MetricsSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &MetricsSnapshot {
        match self {
            MetricsReport::Success(snapshot) | MetricsReport::Failure { snapshot, .. } => snapshot,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MetricsReport::Success(_))
    }
}

/// Query `source` for keyspace counters and derive ratios.
///
/// Never fails: connection or query errors are logged and returned as
/// [`MetricsReport::Failure`].
pub async fn get_cache_metrics<S: StatsSource>(source: &S) -> MetricsReport {
    match source.keyspace_stats().await {
        Ok(stats) => {
            let snapshot = MetricsSnapshot::from(stats);
            info!("Redis Cache Metrics: {}", snapshot);
            MetricsReport::Success(snapshot)
        }
        Err(e) => {
            error!("Error retrieving Redis cache metrics: {}", e);
            MetricsReport::failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use proptest::prelude::*;

    struct FixedStats(Result<KeyspaceStats>);

    impl StatsSource for FixedStats {
        async fn keyspace_stats(&self) -> Result<KeyspaceStats> {
            self.0.clone()
        }
    }

    #[test]
    fn test_eighty_twenty() {
        let snapshot = MetricsSnapshot::from_counts(80, 20);
        assert_eq!(snapshot.total, 100);
        assert!((snapshot.hit_ratio - 0.80).abs() < 1e-12);
        assert!((snapshot.miss_ratio - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_zero_lookups_has_zero_ratios() {
        let snapshot = MetricsSnapshot::from_counts(0, 0);
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.hit_ratio, 0.0);
        assert_eq!(snapshot.miss_ratio, 0.0);
    }

    #[test]
    fn test_only_misses() {
        let snapshot = MetricsSnapshot::from_counts(0, 5);
        assert_eq!(snapshot.hit_ratio, 0.0);
        assert_eq!(snapshot.miss_ratio, 1.0);
    }

    #[tokio::test]
    async fn test_success_report() {
        let source = FixedStats(Ok(KeyspaceStats { hits: 3, misses: 1 }));
        let report = get_cache_metrics(&source).await;

        assert!(report.is_success());
        assert_eq!(report.snapshot().total, 4);
        assert_eq!(report.snapshot().hit_ratio, 0.75);
    }

    #[tokio::test]
    async fn test_failure_report_is_zeroed() {
        let source = FixedStats(Err(Error::BackendError("Connection refused".into())));
        let report = get_cache_metrics(&source).await;

        match &report {
            MetricsReport::Failure { reason, snapshot } => {
                assert!(reason.contains("Connection refused"));
                assert_eq!(*snapshot, MetricsSnapshot::default());
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(report.snapshot().hit_ratio, 0.0);
        assert_eq!(report.snapshot().miss_ratio, 0.0);
    }

    proptest! {
        #[test]
        fn prop_ratios_sum_to_one(hits in 0u64..1_000_000_000, misses in 0u64..1_000_000_000) {
            prop_assume!(hits + misses > 0);
            let snapshot = MetricsSnapshot::from_counts(hits, misses);

            prop_assert_eq!(snapshot.total, hits + misses);
            prop_assert!((snapshot.hit_ratio + snapshot.miss_ratio - 1.0).abs() < 1e-9);
            prop_assert!((snapshot.hit_ratio - hits as f64 / (hits + misses) as f64).abs() < 1e-12);
            prop_assert!((0.0..=1.0).contains(&snapshot.hit_ratio));
        }
    }
}
