//! # quote-ai
//!
//! Multi-provider AI orchestration for quote generation.
//!
//! ## Overview
//!
//! A request for a quote is served from cache when possible; otherwise it is
//! sent to the configured text-generation providers (OpenAI, Anthropic, Azure
//! OpenAI) in priority order. Each provider sits behind its own circuit breaker
//! and sliding-window rate limiter, and each adapter retries transient failures
//! with exponential backoff. The first success is scored for quality, cached and
//! returned; if every provider fails the caller sees one aggregated error.
//!
//! ## Key Features
//!
//! - **Fallback**: [`Orchestrator`] walks providers in priority order
//! - **Caching**: Redis with an in-process fallback via the [`cache`] module
//! - **Resilience**: Circuit breaker and rate limiting via the [`resilience`] module
//! - **Scoring**: Deterministic heuristic quality scores via [`quality`]
//! - **HTTP**: An axum router in [`server`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quote_ai::{GenerationRequest, Orchestrator, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> quote_ai::Result<()> {
//!     let config = ServiceConfig::load()?;
//!     let orchestrator = Orchestrator::from_config(&config).await?;
//!
//!     let request = GenerationRequest::new("inspiration for success");
//!     let quote = orchestrator.generate(&request, None, true).await?;
//!     println!("{} ({}, score {:.2})", quote.text, quote.provider, quote.quality_score);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Requests, results, providers and health snapshots |
//! | [`orchestrator`] | Fallback, caching, single-flight and health checks |
//! | [`providers`] | Provider adapters, wire-format drivers, retry and pricing |
//! | [`cache`] | Cache manager and backends |
//! | [`resilience`] | Circuit breaker and rate limiter |
//! | [`quality`] | Quality scorer |
//! | [`prompt`] | Prompt rendering |
//! | [`config`] | YAML and environment configuration |
//! | [`server`] | HTTP routes |
//! | [`transport`] | HTTP client and credential lookup |

pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod quality;
pub mod resilience;
pub mod server;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::ServiceConfig;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use providers::{ProviderAdapter, ProviderOutput};
pub use quality::{QualityScorer, ScoringWeights};
pub use types::{
    CircuitState, GenerationRequest, GenerationResult, HealthStatus, Provider, ProviderStatus,
    QuoteCategory,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ProviderError, ProviderErrorKind, ServiceErrorKind};
