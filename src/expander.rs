//! Cache expander - strategy-driven lookup with datastore fallback.

use crate::backend::CacheBackend;
use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::repository::DataRepository;
use crate::strategy::CacheStrategy;
use std::time::Instant;

/// Handles cache lookup and fallback logic for whole collections.
///
/// A collection is stored as one entry. Reads never lock: two concurrent
/// misses both load from the datastore and both write the entry, and the
/// last write wins.
///
/// # Example
///
/// ```ignore
/// use property_cache::{CacheExpander, backend::InMemoryBackend};
///
/// let expander = CacheExpander::new(InMemoryBackend::new());
/// let listings = expander
///     .read_collection(":1:all_properties", &repo, CacheStrategy::Refresh)
///     .await?;
/// ```
pub struct CacheExpander<B: CacheBackend> {
    backend: B,
    metrics: Box<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
}

impl<B: CacheBackend> CacheExpander<B> {
    /// Create new expander with given backend.
    pub fn new(backend: B) -> Self {
        CacheExpander {
            backend,
            metrics: Box::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl_policy
    }

    /// Read the collection stored under `cache_key` according to `strategy`.
    ///
    /// Returns `Ok(None)` only for a `Fresh` miss; every other strategy
    /// falls back to `repository` and yields the loaded collection.
    ///
    /// # Errors
    ///
    /// - `Error::BackendError`: cache lookup or delete failed
    /// - `Error::RepositoryError`: datastore access failed
    /// - `Error::ValidationError`: a loaded record failed validation
    ///
    /// A failed cache write after a successful load is logged and ignored.
    /// Cached bytes that fail to decode are treated as a miss.
    pub async fn read_collection<T, R>(
        &self,
        cache_key: &str,
        repository: &R,
        strategy: CacheStrategy,
    ) -> Result<Option<Vec<T>>>
    where
        T: CacheEntity,
        R: DataRepository<T>,
    {
        let timer = Instant::now();

        debug!(
            "» Cache operation for key: {} (strategy: {})",
            cache_key, strategy
        );

        let result = match strategy {
            CacheStrategy::Fresh => self.strategy_fresh::<T>(cache_key).await,
            CacheStrategy::Refresh => self.strategy_refresh(cache_key, repository).await,
            CacheStrategy::Invalidate => self.strategy_invalidate(cache_key, repository).await,
            CacheStrategy::Bypass => self.load_and_store(cache_key, repository).await.map(Some),
        };

        match result {
            Ok(Some(lookup)) => {
                lookup.collection.validate()?;
                if lookup.from_cache {
                    self.metrics.record_hit(cache_key, timer.elapsed());
                } else {
                    self.metrics.record_miss(cache_key, timer.elapsed());
                }
                info!(
                    "✓ Cache operation for {} succeeded in {:?} ({} records, {})",
                    cache_key,
                    timer.elapsed(),
                    lookup.collection.len(),
                    if lookup.from_cache { "cache" } else { "datastore" }
                );
                Ok(Some(lookup.collection))
            }
            Ok(None) => {
                self.metrics.record_miss(cache_key, timer.elapsed());
                debug!("Nothing cached under {} and no fallback", cache_key);
                Ok(None)
            }
            Err(e) => {
                self.metrics.record_error(cache_key, &e.to_string());
                error!("✗ Cache operation for {} failed: {}", cache_key, e);
                Err(e)
            }
        }
    }

    /// Remove the entry stored under `cache_key`.
    pub async fn invalidate(&self, cache_key: &str) -> Result<()> {
        self.backend.delete(cache_key).await?;
        info!("✓ Cache invalidated for {}", cache_key);
        Ok(())
    }

    /// Fresh strategy: Cache only, no database fallback.
    async fn strategy_fresh<T: CacheEntity>(&self, cache_key: &str) -> Result<Option<Lookup<T>>> {
        match self.cached::<T>(cache_key).await? {
            Some(collection) => {
                debug!("✓ Cache hit (Fresh strategy)");
                Ok(Some(Lookup::cached(collection)))
            }
            None => {
                debug!("✗ Cache miss (Fresh strategy) - no fallback");
                Ok(None)
            }
        }
    }

    /// Refresh strategy: Try cache, fallback to database on miss.
    async fn strategy_refresh<T, R>(
        &self,
        cache_key: &str,
        repository: &R,
    ) -> Result<Option<Lookup<T>>>
    where
        T: CacheEntity,
        R: DataRepository<T>,
    {
        if let Some(collection) = self.cached::<T>(cache_key).await? {
            debug!("✓ Cache hit (Refresh strategy)");
            return Ok(Some(Lookup::cached(collection)));
        }

        debug!("Cache miss, falling back to database");
        self.load_and_store(cache_key, repository).await.map(Some)
    }

    /// Invalidate strategy: Clear cache and refresh from database.
    async fn strategy_invalidate<T, R>(
        &self,
        cache_key: &str,
        repository: &R,
    ) -> Result<Option<Lookup<T>>>
    where
        T: CacheEntity,
        R: DataRepository<T>,
    {
        self.backend.delete(cache_key).await?;
        debug!("✓ Cache invalidated for {}", cache_key);

        self.load_and_store(cache_key, repository).await.map(Some)
    }

    /// Look up and decode the entry under `cache_key`.
    ///
    /// An entry this crate cannot decode (foreign writer, older schema,
    /// corrupt payload) counts as a miss so the next load overwrites it.
    async fn cached<T: CacheEntity>(&self, cache_key: &str) -> Result<Option<Vec<T>>> {
        let Some(bytes) = self.backend.get(cache_key).await? else {
            return Ok(None);
        };

        match Vec::<T>::deserialize_from_cache(&bytes) {
            Ok(collection) => Ok(Some(collection)),
            Err(
                e @ (Error::InvalidCacheEntry(_)
                | Error::VersionMismatch { .. }
                | Error::DeserializationError(_)),
            ) => {
                warn!("⚠ Ignoring unreadable cache entry {}: {}", cache_key, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn load_and_store<T, R>(&self, cache_key: &str, repository: &R) -> Result<Lookup<T>>
    where
        T: CacheEntity,
        R: DataRepository<T>,
    {
        let collection = repository.fetch_all().await?;

        let ttl = self.ttl_policy.get_ttl(T::cache_prefix());
        let bytes = collection.serialize_for_cache()?;
        if let Err(e) = self.backend.set(cache_key, bytes, ttl).await {
            warn!("⚠ Failed to populate cache for {}: {}", cache_key, e);
        }

        Ok(Lookup {
            collection,
            from_cache: false,
        })
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

struct Lookup<T> {
    collection: Vec<T>,
    from_cache: bool,
}

impl<T> Lookup<T> {
    fn cached(collection: Vec<T>) -> Self {
        Lookup {
            collection,
            from_cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::repository::InMemoryRepository;
    use serde::{Deserialize, Serialize};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct TestEntity {
        id: String,
        value: String,
    }

    impl CacheEntity for TestEntity {
        fn cache_prefix() -> &'static str {
            "test"
        }
    }

    fn entity(id: &str, value: &str) -> TestEntity {
        TestEntity {
            id: id.to_string(),
            value: value.to_string(),
        }
    }

    async fn seed(backend: &InMemoryBackend, key: &str, items: Vec<TestEntity>) {
        let bytes = items.serialize_for_cache().expect("Failed to serialize");
        backend.set(key, bytes, None).await.expect("Failed to set");
    }

    #[tokio::test]
    async fn test_fresh_strategy_hit() {
        let backend = InMemoryBackend::new();
        let expander = CacheExpander::new(backend.clone());
        seed(&backend, "all_tests", vec![entity("1", "cached")]).await;

        let repo = InMemoryRepository::<TestEntity>::new();
        let result = expander
            .read_collection("all_tests", &repo, CacheStrategy::Fresh)
            .await
            .expect("Failed to execute");

        assert_eq!(result, Some(vec![entity("1", "cached")]));
        assert_eq!(repo.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_fresh_strategy_miss_has_no_fallback() {
        let expander = CacheExpander::new(InMemoryBackend::new());
        let repo = InMemoryRepository::with_records(vec![entity("1", "db")]);

        let result = expander
            .read_collection("all_tests", &repo, CacheStrategy::Fresh)
            .await
            .expect("Failed to execute");

        assert!(result.is_none());
        assert_eq!(repo.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_strategy_populates_then_serves_cache() {
        let backend = InMemoryBackend::new();
        let expander = CacheExpander::new(backend.clone());
        let repo = InMemoryRepository::with_records(vec![entity("1", "db")]);

        let first = expander
            .read_collection("all_tests", &repo, CacheStrategy::Refresh)
            .await
            .expect("Failed to execute");
        assert_eq!(first, Some(vec![entity("1", "db")]));
        assert_eq!(repo.fetch_count(), 1);
        assert!(backend.get("all_tests").await.expect("Failed to get").is_some());

        // Datastore changes are not visible until the entry goes away.
        repo.replace(vec![entity("1", "updated")]);
        let second = expander
            .read_collection("all_tests", &repo, CacheStrategy::Refresh)
            .await
            .expect("Failed to execute");
        assert_eq!(second, Some(vec![entity("1", "db")]));
        assert_eq!(repo.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_strategy_caches_empty_collection() {
        let backend = InMemoryBackend::new();
        let expander = CacheExpander::new(backend.clone());
        let repo = InMemoryRepository::<TestEntity>::new();

        for _ in 0..2 {
            let result = expander
                .read_collection("all_tests", &repo, CacheStrategy::Refresh)
                .await
                .expect("Failed to execute");
            assert_eq!(result, Some(Vec::new()));
        }
        assert_eq!(repo.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_strategy() {
        let backend = InMemoryBackend::new();
        let expander = CacheExpander::new(backend.clone());
        seed(&backend, "all_tests", vec![entity("1", "stale")]).await;
        let repo = InMemoryRepository::with_records(vec![entity("1", "fresh")]);

        let result = expander
            .read_collection("all_tests", &repo, CacheStrategy::Invalidate)
            .await
            .expect("Failed to execute");
        assert_eq!(result, Some(vec![entity("1", "fresh")]));

        let cached_bytes = backend
            .get("all_tests")
            .await
            .expect("Failed to get")
            .expect("Cache is empty");
        let cached =
            Vec::<TestEntity>::deserialize_from_cache(&cached_bytes).expect("Failed to deserialize");
        assert_eq!(cached, vec![entity("1", "fresh")]);
    }

    #[tokio::test]
    async fn test_bypass_strategy_ignores_cache() {
        let backend = InMemoryBackend::new();
        let expander = CacheExpander::new(backend.clone());
        seed(&backend, "all_tests", vec![entity("1", "cached")]).await;
        let repo = InMemoryRepository::with_records(vec![entity("1", "db")]);

        let result = expander
            .read_collection("all_tests", &repo, CacheStrategy::Bypass)
            .await
            .expect("Failed to execute");

        assert_eq!(result, Some(vec![entity("1", "db")]));
        assert_eq!(repo.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_repository_error_propagates_and_nothing_is_cached() {
        let backend = InMemoryBackend::new();
        let expander = CacheExpander::new(backend.clone());
        let repo = InMemoryRepository::<TestEntity>::new();
        repo.set_failure(Some("database is down"));

        let err = expander
            .read_collection("all_tests", &repo, CacheStrategy::Refresh)
            .await
            .unwrap_err();

        assert_eq!(err, Error::RepositoryError("database is down".into()));
        assert_eq!(backend.len().await, 0);
    }

    #[tokio::test]
    async fn test_foreign_entry_is_a_miss_and_gets_overwritten() {
        let backend = InMemoryBackend::new();
        // bytes written by another client sharing the key
        let foreign = b"\x80\x04\x95\x0b\x00\x00\x00\x00\x00\x00\x00]\x94.".to_vec();
        backend
            .set("all_tests", foreign, None)
            .await
            .expect("Failed to set");
        let expander = CacheExpander::new(backend.clone());
        let repo = InMemoryRepository::with_records(vec![entity("1", "db")]);

        for _ in 0..3 {
            let result = expander
                .read_collection("all_tests", &repo, CacheStrategy::Refresh)
                .await
                .expect("Failed to execute");
            assert_eq!(result, Some(vec![entity("1", "db")]));
        }
        assert_eq!(repo.fetch_count(), 1);

        let bytes = backend
            .get("all_tests")
            .await
            .expect("Failed to get")
            .expect("Cache is empty");
        assert_eq!(
            Vec::<TestEntity>::deserialize_from_cache(&bytes).expect("Failed to deserialize"),
            vec![entity("1", "db")]
        );
    }

    #[tokio::test]
    async fn test_other_schema_version_is_a_fresh_miss() {
        let backend = InMemoryBackend::new();
        let mut bytes = vec![entity("1", "old")]
            .serialize_for_cache()
            .expect("Failed to serialize");
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        backend
            .set("all_tests", bytes, None)
            .await
            .expect("Failed to set");
        let expander = CacheExpander::new(backend);
        let repo = InMemoryRepository::<TestEntity>::new();

        let result = expander
            .read_collection("all_tests", &repo, CacheStrategy::Fresh)
            .await
            .expect("Failed to execute");
        assert!(result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_policy_expires_entry() {
        let backend = InMemoryBackend::new();
        let expander = CacheExpander::new(backend.clone())
            .with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(300)));
        let repo = InMemoryRepository::with_records(vec![entity("1", "data")]);

        expander
            .read_collection("all_tests", &repo, CacheStrategy::Refresh)
            .await
            .expect("Failed to execute");
        tokio::time::advance(Duration::from_secs(301)).await;
        expander
            .read_collection("all_tests", &repo, CacheStrategy::Refresh)
            .await
            .expect("Failed to execute");

        assert_eq!(repo.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_custom_metrics() {
        #[derive(Clone, Default)]
        struct TestMetrics {
            hits: Arc<Mutex<usize>>,
            misses: Arc<Mutex<usize>>,
            errors: Arc<Mutex<usize>>,
        }

        impl CacheMetrics for TestMetrics {
            fn record_hit(&self, _key: &str, _duration: Duration) {
                *self.hits.lock().expect("Failed to lock hits") += 1;
            }

            fn record_miss(&self, _key: &str, _duration: Duration) {
                *self.misses.lock().expect("Failed to lock misses") += 1;
            }

            fn record_error(&self, _key: &str, _error: &str) {
                *self.errors.lock().expect("Failed to lock errors") += 1;
            }
        }

        let metrics = TestMetrics::default();
        let expander =
            CacheExpander::new(InMemoryBackend::new()).with_metrics(Box::new(metrics.clone()));
        let repo = InMemoryRepository::with_records(vec![entity("1", "data")]);

        // miss, then hit
        for _ in 0..2 {
            expander
                .read_collection("all_tests", &repo, CacheStrategy::Refresh)
                .await
                .expect("Failed to execute");
        }
        assert_eq!(*metrics.misses.lock().expect("Failed to lock misses"), 1);
        assert_eq!(*metrics.hits.lock().expect("Failed to lock hits"), 1);

        repo.set_failure(Some("boom"));
        let _ = expander
            .read_collection("other", &repo, CacheStrategy::Refresh)
            .await;
        assert_eq!(*metrics.errors.lock().expect("Failed to lock errors"), 1);
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let backend = InMemoryBackend::new();
        seed(&backend, "all_tests", vec![entity("1", "a")]).await;
        let expander = CacheExpander::new(backend.clone());

        expander.invalidate("all_tests").await.expect("Failed to invalidate");
        assert!(expander
            .backend()
            .get("all_tests")
            .await
            .expect("Failed to get")
            .is_none());
    }
}
