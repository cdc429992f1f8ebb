//! Redis-backed remote cache level
//!
//! Values travel as JSON strings and expire through Redis `SETEX`.

use ::redis::AsyncCommands;
use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use std::time::Duration;

use super::CacheStore;
use crate::utils::error::CacheError;

/// Pooled Redis client
pub struct RedisStore {
    pool: Pool,
    url: String,
}

impl RedisStore {
    /// Build the connection pool
    ///
    /// No connection is opened yet; reachability is checked with
    /// [`CacheStore::ping`].
    pub fn connect(url: &str, pool_size: usize) -> Result<Self, CacheError> {
        let pool = PoolConfig::from_url(url)
            .builder()
            .map_err(|e| CacheError::InvalidConfig(format!("Invalid Redis URL {url}: {e}")))?
            .max_size(pool_size.max(1))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::InvalidConfig(format!("Failed to create Redis connection pool: {e}")))?;

        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let reply: String = ::redis::cmd("PING").query_async(&mut *conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Backend(format!("Unexpected PING reply: {reply}")))
        }
    }
}
