//! Read-through access to the cached listing collection.

use crate::backend::CacheBackend;
use crate::config::CacheSettings;
use crate::error::{Error, Result};
use crate::expander::CacheExpander;
use crate::key::{CacheKeyBuilder, ALL_LISTINGS_KEY};
use crate::listing::Listing;
use crate::observability::{CacheMetrics, TtlPolicy};
use crate::repository::DataRepository;
use crate::strategy::CacheStrategy;
use std::sync::Arc;

/// Serves the full listing collection from the shared cache, loading it from
/// the datastore on a miss.
///
/// The collection lives under one fixed key and expires after the listing
/// TTL. Writes to the datastore do not invalidate it; call
/// [`invalidate_listings`](Self::invalidate_listings) or
/// [`refresh_listings`](Self::refresh_listings) when fresher data is needed.
///
/// Cloning is cheap; clones share the backend and repository.
pub struct ListingService<B: CacheBackend, R> {
    expander: Arc<CacheExpander<B>>,
    repository: Arc<R>,
    keys: CacheKeyBuilder,
}

impl<B: CacheBackend, R> Clone for ListingService<B, R> {
    fn clone(&self) -> Self {
        ListingService {
            expander: Arc::clone(&self.expander),
            repository: Arc::clone(&self.repository),
            keys: self.keys.clone(),
        }
    }
}

impl<B, R> ListingService<B, R>
where
    B: CacheBackend,
    R: DataRepository<Listing>,
{
    pub fn new(backend: B, repository: R, settings: &CacheSettings) -> Self {
        let expander = CacheExpander::new(backend)
            .with_ttl_policy(TtlPolicy::Fixed(settings.listing_ttl()));
        Self::from_parts(expander, repository, settings.keys())
    }

    /// Build from a preconfigured expander, e.g. one with metrics attached.
    pub fn from_parts(expander: CacheExpander<B>, repository: R, keys: CacheKeyBuilder) -> Self {
        ListingService {
            expander: Arc::new(expander),
            repository: Arc::new(repository),
            keys,
        }
    }

    pub fn with_metrics(
        backend: B,
        repository: R,
        settings: &CacheSettings,
        metrics: Box<dyn CacheMetrics>,
    ) -> Self {
        let expander = CacheExpander::new(backend)
            .with_ttl_policy(TtlPolicy::Fixed(settings.listing_ttl()))
            .with_metrics(metrics);
        Self::from_parts(expander, repository, settings.keys())
    }

    /// Backend key of the cached collection.
    pub fn cache_key(&self) -> String {
        self.keys.build(ALL_LISTINGS_KEY)
    }

    /// Every listing, from cache when present.
    ///
    /// # Errors
    /// Datastore failures propagate as `Error::RepositoryError`; backend read
    /// failures as `Error::BackendError`.
    pub async fn get_all_listings(&self) -> Result<Vec<Listing>> {
        self.read(CacheStrategy::Refresh).await
    }

    /// Drop the cached collection; the next read reloads it.
    pub async fn invalidate_listings(&self) -> Result<()> {
        self.expander.invalidate(&self.cache_key()).await
    }

    /// Reload the collection from the datastore and repopulate the cache.
    pub async fn refresh_listings(&self) -> Result<Vec<Listing>> {
        self.read(CacheStrategy::Invalidate).await
    }

    pub fn backend(&self) -> &B {
        self.expander.backend()
    }

    async fn read(&self, strategy: CacheStrategy) -> Result<Vec<Listing>> {
        let key = self.cache_key();
        self.expander
            .read_collection(&key, self.repository.as_ref(), strategy.clone())
            .await?
            .ok_or_else(|| {
                Error::ValidationError(format!("{} read of {} produced no data", strategy, key))
            })
    }
}
