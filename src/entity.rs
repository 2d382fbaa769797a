//! Core entity trait that all cached entities must implement.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Trait that all entities stored in cache must implement.
///
/// Entities never pick their own cache key; callers build keys with
/// [`CacheKeyBuilder`](crate::key::CacheKeyBuilder).
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use property_cache::CacheEntity;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct Agent {
///     pub id: i64,
///     pub name: String,
/// }
///
/// impl CacheEntity for Agent {
///     fn cache_prefix() -> &'static str {
///         "agent"
///     }
/// }
/// ```
pub trait CacheEntity: Send + Sync + Serialize + for<'de> Deserialize<'de> + Clone {
    /// Return the cache prefix for this entity type.
    ///
    /// Used to look up per-type TTLs in [`TtlPolicy`](crate::observability::TtlPolicy).
    fn cache_prefix() -> &'static str;

    /// Serialize entity for cache storage.
    ///
    /// See `crate::serialization` for the envelope format.
    fn serialize_for_cache(&self) -> Result<Vec<u8>> {
        crate::serialization::serialize_for_cache(self)
    }

    /// Deserialize entity from cache storage.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCacheEntry`: Bad magic or truncated envelope
    /// - `Error::VersionMismatch`: Schema version changed
    /// - `Error::DeserializationError`: Corrupted payload
    fn deserialize_from_cache(bytes: &[u8]) -> Result<Self> {
        crate::serialization::deserialize_from_cache(bytes)
    }

    /// Optional: Validate entity after loading it from cache or datastore.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Collections are cached as a single entry under a caller-chosen key.
impl<T: CacheEntity> CacheEntity for Vec<T> {
    fn cache_prefix() -> &'static str {
        T::cache_prefix()
    }

    fn validate(&self) -> Result<()> {
        self.iter().try_for_each(CacheEntity::validate)
    }
}
