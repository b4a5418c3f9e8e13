//! HTTP surface over an [`Orchestrator`].
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /quotes/generate` | one quote, cache-aware |
//! | `POST /quotes/generate-multiple` | up to ten variations, best first |
//! | `GET /ai-service/health` | per-provider status and cache statistics |
//! | `POST /ai-service/circuit-breaker/reset/{provider}` | operator override |
//!
//! Errors are rendered as `{"error": {"code": ..., "message": ...}}`.

mod error;
pub mod handlers;

pub use error::ApiError;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;
use crate::Result;

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/quotes/generate", post(handlers::generate))
        .route("/quotes/generate-multiple", post(handlers::generate_multiple))
        .route("/ai-service/health", get(handlers::health))
        .route(
            "/ai-service/circuit-breaker/reset/{provider}",
            post(handlers::reset_circuit_breaker),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Bind `addr` and serve until the task is cancelled or the listener fails.
pub async fn serve(orchestrator: Arc<Orchestrator>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "quote-ai server listening");
    axum::serve(listener, router(orchestrator)).await?;
    Ok(())
}
