//! # Resilience Primitives Module
//!
//! Per-provider protection applied by the orchestrator before every provider call.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`circuit_breaker`] | Three-state breaker that isolates a failing provider |
//! | [`rate_limiter`] | Sliding-window quota per provider |
//!
//! ## Circuit Breaker
//!
//! - **Closed**: requests pass; consecutive failures inside a trailing window are counted
//! - **Open**: threshold reached, requests fail fast with no network call
//! - **Half-Open**: cooldown elapsed, exactly one trial request is admitted
//!
//! ```rust
//! use quote_ai::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::new()
//!     .with_failure_threshold(5)
//!     .with_cooldown(Duration::from_secs(30));
//! let breaker = CircuitBreaker::new(config);
//!
//! if breaker.allow_request() {
//!     // call the provider...
//!     breaker.record_success();
//! }
//! ```
//!
//! ## Rate Limiter
//!
//! ```rust
//! use quote_ai::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//! use quote_ai::types::Provider;
//!
//! # tokio_test::block_on(async {
//! let config = RateLimiterConfig::new().with_quota(Provider::OpenAi, 60);
//! let limiter = RateLimiter::new([Provider::OpenAi], &config);
//! assert!(limiter.allow(Provider::OpenAi).await);
//! # });
//! ```

pub mod circuit_breaker;
pub mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakers};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
