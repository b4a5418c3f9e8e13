//! Cache backend implementations.

use super::key::CacheKey;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Backend failure. Never leaves the cache module: the manager turns it into a miss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// A stored payload plus its expiry. A TTL past the clock's range never expires.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
    async fn len(&self) -> Result<usize, CacheError>;
    fn name(&self) -> &'static str;
}

/// In-process LRU cache with per-entry expiry.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, CacheEntry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Operation("memory cache poisoned".into()))
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.lock()?;
        let expired = match entries.get(&key.hash) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.data.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(&key.hash);
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.lock()?
            .put(key.hash.clone(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.lock()?.pop(&key.hash).is_some())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.lock()?.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, e)| !e.is_expired())
            .count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: &[u8], _: Duration) -> Result<(), CacheError> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool, CacheError> {
        Ok(false)
    }
    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
    async fn len(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
