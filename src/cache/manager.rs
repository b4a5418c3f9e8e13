//! Cache manager.

use super::backend::{CacheBackend, CacheError, MemoryCache};
use super::key::CacheKey;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub enabled: bool,
    pub max_entry_size: usize,
    pub key_prefix: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            enabled: true,
            max_entry_size: 1024 * 1024,
            key_prefix: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
    /// Operations served by the in-process store because the primary failed.
    pub fallbacks: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
    fallbacks: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Cache-aside front for the orchestrator.
///
/// Reads and writes go to the primary (durable) backend when one is configured.
/// Any primary failure is logged and served by the in-process fallback instead;
/// no method on this type ever returns an error.
pub struct CacheManager {
    config: CacheConfig,
    primary: Option<Box<dyn CacheBackend>>,
    fallback: Box<dyn CacheBackend>,
    stats: Arc<AtomicStats>,
}

impl CacheManager {
    pub fn new(
        config: CacheConfig,
        primary: Option<Box<dyn CacheBackend>>,
        fallback: Box<dyn CacheBackend>,
    ) -> Self {
        Self {
            config,
            primary,
            fallback,
            stats: Arc::new(AtomicStats::new()),
        }
    }

    /// In-process cache only.
    pub fn in_memory(config: CacheConfig, max_entries: usize) -> Self {
        Self::new(config, None, Box::new(MemoryCache::new(max_entries)))
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.config.enabled {
            return None;
        }
        let prefixed = self.prefix_key(key);

        let data = match &self.primary {
            Some(primary) => match primary.get(&prefixed).await {
                Ok(Some(data)) => Some(data),
                // entries written while the primary was down live in the fallback
                Ok(None) => self.fallback_get(&prefixed, false).await,
                Err(e) => {
                    self.degrade("get", primary.name(), &e);
                    self.fallback_get(&prefixed, true).await
                }
            },
            None => self.fallback_get(&prefixed, false).await,
        };

        match data {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(val) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    Some(val)
                }
                Err(e) => {
                    warn!(key = %prefixed, error = %e, "discarding undecodable cache entry");
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) {
        self.set_with_ttl(key, value, self.config.default_ttl).await
    }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if !self.config.enabled {
            return;
        }
        let data = match serde_json::to_vec(value) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "cache value not serializable");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        if data.len() > self.config.max_entry_size {
            return;
        }
        let prefixed = self.prefix_key(key);

        if let Some(primary) = &self.primary {
            match primary.set(&prefixed, &data, ttl).await {
                Ok(()) => {
                    self.stats.sets.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(e) => {
                    self.degrade("set", primary.name(), &e);
                    self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        match self.fallback.set(&prefixed, &data, ttl).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(error = %e, "fallback cache set failed");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Remove an entry from every store. Returns whether anything was removed.
    pub async fn delete(&self, key: &CacheKey) -> bool {
        if !self.config.enabled {
            return false;
        }
        let prefixed = self.prefix_key(key);
        let mut removed = false;

        if let Some(primary) = &self.primary {
            match primary.delete(&prefixed).await {
                Ok(d) => removed |= d,
                Err(e) => self.degrade("delete", primary.name(), &e),
            }
        }
        match self.fallback.delete(&prefixed).await {
            Ok(d) => removed |= d,
            Err(e) => {
                warn!(error = %e, "fallback cache delete failed");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        if removed {
            self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.primary {
            Some(p) => p.name(),
            None => self.fallback.name(),
        }
    }

    async fn fallback_get(&self, key: &CacheKey, degraded: bool) -> Option<Vec<u8>> {
        if degraded {
            self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        match self.fallback.get(key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "fallback cache get failed");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn degrade(&self, op: &str, backend: &str, e: &CacheError) {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
        warn!(
            operation = op,
            backend = backend,
            error = %e,
            "primary cache unavailable, using in-process fallback"
        );
    }

    fn prefix_key(&self, key: &CacheKey) -> CacheKey {
        if let Some(ref p) = self.config.key_prefix {
            CacheKey::new(format!("{}{}", p, key.hash))
        } else {
            key.clone()
        }
    }
}
