//! # Response Caching Module
//!
//! Cache-aside storage for generated quotes, so identical requests inside the
//! TTL are answered without calling any provider.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Front door: primary + in-process fallback, TTL, statistics |
//! | [`CacheConfig`] | TTL, size limit, key prefix |
//! | [`CacheBackend`] | Trait for storage backends |
//! | [`RedisCache`] | Durable shared store |
//! | [`MemoryCache`] | In-process LRU with per-entry expiry |
//! | [`NullCache`] | No-op backend |
//! | [`CacheKeyGenerator`] | Deterministic SHA-256 key from normalised request fields |
//!
//! Backend errors ([`CacheError`]) never leave this module: the manager logs
//! them, degrades to the fallback store, and reports a miss when nothing is found.
//!
//! ```rust
//! use quote_ai::cache::{CacheConfig, CacheManager};
//! use std::time::Duration;
//!
//! let cache = CacheManager::in_memory(CacheConfig::new().with_ttl(Duration::from_secs(3600)), 1000);
//! assert_eq!(cache.backend_name(), "memory");
//! ```

mod backend;
mod key;
mod manager;
mod redis;

pub use self::redis::RedisCache;
pub use backend::{CacheBackend, CacheEntry, CacheError, MemoryCache, NullCache};
pub use key::{CacheKey, CacheKeyGenerator};
pub use manager::{CacheConfig, CacheManager, CacheStats};
