//! Redis cache backend.

use super::backend::{CacheBackend, CacheError};
use super::key::CacheKey;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

/// Durable shared cache on top of a Redis connection manager.
///
/// `namespace` scopes `clear` and `len` to this service's keys; individual keys
/// arrive already prefixed by the manager.
pub struct RedisCache {
    connection_manager: redis::aio::ConnectionManager,
    namespace: String,
}

impl RedisCache {
    pub async fn connect(connection_string: &str, namespace: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(connection_string).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = client.get_connection_manager().await.map_err(|e| {
            CacheError::Connection(format!("Failed to connect to Redis: {}", e))
        })?;

        Ok(Self {
            connection_manager,
            namespace: namespace.into(),
        })
    }

    fn pattern(&self) -> String {
        format!("{}*", self.namespace)
    }

    async fn namespaced_keys(&self) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection_manager.clone();
        conn.keys::<_, Vec<String>>(self.pattern())
            .await
            .map_err(|e| CacheError::Operation(format!("Redis KEYS failed: {}", e)))
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection_manager.clone();
        conn.get::<_, Option<Vec<u8>>>(key.as_str())
            .await
            .map_err(|e| CacheError::Operation(format!("Redis GET failed: {}", e)))
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection_manager.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key.as_str(), value, seconds)
            .await
            .map_err(|e| CacheError::Operation(format!("Redis SETEX failed: {}", e)))?;
        debug!(key = key.as_str(), ttl_secs = seconds, "stored cache entry in redis");
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let mut conn = self.connection_manager.clone();
        let removed: i64 = conn
            .del(key.as_str())
            .await
            .map_err(|e| CacheError::Operation(format!("Redis DEL failed: {}", e)))?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let keys = self.namespaced_keys().await?;
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection_manager.clone();
        let _: i64 = conn
            .del(keys)
            .await
            .map_err(|e| CacheError::Operation(format!("Redis DEL failed: {}", e)))?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.namespaced_keys().await?.len())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
