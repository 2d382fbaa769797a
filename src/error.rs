//! Error types for cache, datastore and configuration failures.

use thiserror::Error;

/// Errors produced by cache operations.
///
/// Backend, pool, SQL and configuration errors are converted into one of
/// these variants at the boundary where they occur, carrying the original
/// message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Entity could not be encoded for cache storage.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Cached payload could not be decoded.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Cached bytes do not carry a valid envelope.
    #[error("Invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// Cached entry was written with a different schema version.
    #[error("Cache schema version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Cache backend unavailable or command failed.
    #[error("Cache backend error: {0}")]
    BackendError(String),

    /// Datastore query failed.
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::ConfigError(e.to_string())
    }
}
