//! # Types Module
//!
//! Core data model shared by every layer of the orchestrator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GenerationRequest`] | What the caller wants generated |
//! | [`QuoteCategory`] | Closed set of quote categories |
//! | [`Provider`] | Remote text-generation provider, in priority order |
//! | [`GenerationResult`] | Generated text plus provider, cost, score and timing |
//! | [`ProviderHealth`] | Snapshot of a provider's breaker and limiter state |
//! | [`ProviderStatus`] | Health-check entry including ping latency and usage |
//!
//! ## Example
//!
//! ```rust
//! use quote_ai::types::{GenerationRequest, QuoteCategory};
//!
//! let request = GenerationRequest::new("inspiration for success")
//!     .with_category(QuoteCategory::Motivational)
//!     .with_max_tokens(150);
//! assert!(request.validate().is_ok());
//! ```

pub mod provider;
pub mod request;
pub mod result;

pub use provider::{Provider, UnknownProvider};
pub use request::{GenerationRequest, QuoteCategory};
pub use result::{
    CircuitState, GenerationResult, HealthStatus, ProviderHealth, ProviderStatus, UsageStats,
};
