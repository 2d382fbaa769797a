//! Datastore access for cached collections.

use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Source of truth for a cached collection.
///
/// Implement this for your database layer (SQLx, Diesel, an HTTP API...).
/// Errors surface to the caller of the cached read unchanged.
pub trait DataRepository<T: CacheEntity>: Send + Sync {
    /// Load every record.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<T>>> + Send;
}

/// In-memory repository for tests and demos.
///
/// Counts calls to `fetch_all` and can be switched into a failing mode.
#[derive(Clone)]
pub struct InMemoryRepository<T> {
    records: Arc<RwLock<Vec<T>>>,
    fetches: Arc<AtomicUsize>,
    failure: Arc<RwLock<Option<String>>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        InMemoryRepository {
            records: Arc::new(RwLock::new(Vec::new())),
            fetches: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(RwLock::new(None)),
        }
    }
}

impl<T: Clone> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<T>) -> Self {
        let repo = Self::new();
        repo.replace(records);
        repo
    }

    pub fn insert(&self, record: T) {
        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }

    pub fn replace(&self, new_records: Vec<T>) {
        if let Ok(mut records) = self.records.write() {
            *records = new_records;
        }
    }

    /// Make every following fetch fail with `reason`; `None` restores it.
    pub fn set_failure(&self, reason: Option<&str>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = reason.map(str::to_string);
        }
    }

    /// Number of `fetch_all` calls so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl<T: CacheEntity> DataRepository<T> for InMemoryRepository<T> {
    async fn fetch_all(&self) -> Result<Vec<T>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let failure = self
            .failure
            .read()
            .map_err(|_| Error::RepositoryError("repository lock poisoned".to_string()))?
            .clone();
        if let Some(reason) = failure {
            return Err(Error::RepositoryError(reason));
        }

        let records = self
            .records
            .read()
            .map_err(|_| Error::RepositoryError("repository lock poisoned".to_string()))?;
        Ok(records.clone())
    }
}

#[cfg(feature = "postgres")]
pub use postgres::PgListingRepository;

#[cfg(feature = "postgres")]
mod postgres {
    use super::DataRepository;
    use crate::error::{Error, Result};
    use crate::listing::Listing;
    use sqlx::PgPool;

    const SELECT_ALL: &str = "SELECT id::int8 AS id, title, description, price::float8 AS price, \
         location, created_at FROM properties_property ORDER BY id";

    /// Reads listings from the `properties_property` table.
    #[derive(Clone)]
    pub struct PgListingRepository {
        pool: PgPool,
    }

    impl PgListingRepository {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        /// Connect lazily; the first query opens the connection.
        pub fn connect_lazy(database_url: &str) -> Result<Self> {
            let pool = PgPool::connect_lazy(database_url)
                .map_err(|e| Error::ConfigError(format!("Invalid database URL: {}", e)))?;
            Ok(Self::new(pool))
        }
    }

    impl DataRepository<Listing> for PgListingRepository {
        async fn fetch_all(&self) -> Result<Vec<Listing>> {
            let rows = sqlx::query_as::<_, Listing>(SELECT_ALL)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::RepositoryError(e.to_string()))?;

            debug!("✓ Loaded {} listings from datastore", rows.len());
            Ok(rows)
        }
    }
}
