//! Redis cache backend implementation.

use super::{parse_info, CacheBackend, KeyspaceStats, RedisConfig, StatsSource};
use crate::error::{Error, Result};
use deadpool_redis::redis::cmd;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use std::time::Duration;

/// Redis backend with connection pooling.
///
/// Creating the backend does not connect; the first command does. Values
/// are written with `SET key value EX ttl`.
///
/// # Example
///
/// ```no_run
/// # use property_cache::backend::{RedisBackend, RedisConfig, CacheBackend};
/// # use property_cache::error::Result;
/// # async fn example() -> Result<()> {
/// let backend = RedisBackend::new(RedisConfig::default())?;
/// backend.set("key", b"value".to_vec(), None).await?;
/// let value = backend.get("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Create new Redis backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if the URL is malformed or pool creation fails
    pub fn new(config: RedisConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.connection_timeout_secs);

        let mut pool_config = PoolConfig::new(config.pool_size as usize);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.wait = Some(timeout);

        let mut cfg = Config::from_url(config.url.clone());
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "✓ Redis backend initialized for {} (pool size: {})",
            config.url, config.pool_size
        );

        Ok(RedisBackend { pool })
    }

    /// Create from a URL with the default pool settings.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        Self::new(RedisConfig {
            url: url.into(),
            ..Default::default()
        })
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::BackendError(format!("Failed to get Redis connection: {}", e)))
    }
}

impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis GET failed for key {}: {}", key, e)))?;

        if value.is_some() {
            debug!("✓ Redis GET {} -> HIT", key);
        } else {
            debug!("✓ Redis GET {} -> MISS", key);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;

        let mut command = cmd("SET");
        command.arg(key).arg(value);
        // EX rejects 0, so sub-second TTLs round up to one second
        if let Some(d) = ttl {
            command.arg("EX").arg(d.as_secs().max(1));
        }

        command
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis SET failed for key {}: {}", key, e)))?;

        if let Some(d) = ttl {
            debug!("✓ Redis SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ Redis SET {}", key);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| {
                Error::BackendError(format!("Redis DELETE failed for key {}: {}", key, e))
            })?;

        debug!("✓ Redis DELETE {}", key);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(_) => return Ok(false),
        };

        match cmd("PING").query_async::<String>(&mut conn).await {
            Ok(reply) => Ok(reply == "PONG"),
            Err(_) => Ok(false),
        }
    }
}

impl StatsSource for RedisBackend {
    async fn keyspace_stats(&self) -> Result<KeyspaceStats> {
        let mut conn = self.connection().await?;

        let raw: String = cmd("INFO")
            .arg("stats")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis INFO failed: {}", e)))?;

        KeyspaceStats::from_info(&parse_info(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_default() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379/1");
        assert_eq!(config.connection_timeout_secs, 5);
        assert!(config.pool_size > 0);
    }

    #[tokio::test]
    async fn test_backend_creation_does_not_connect() {
        // Nothing listens on port 1; pool creation must still succeed.
        let backend = RedisBackend::new(RedisConfig {
            url: "redis://127.0.0.1:1/0".to_string(),
            pool_size: 2,
            connection_timeout_secs: 1,
        })
        .expect("Failed to create backend");

        assert!(!backend.health_check().await.expect("health check errored"));
        let err = backend.keyspace_stats().await.unwrap_err();
        assert!(matches!(err, Error::BackendError(_)));
    }

    #[test]
    fn test_malformed_url_is_config_error() {
        let err = RedisBackend::from_url("not a url").err().expect("expected error");
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
