//! HTTP request handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::ApiError;
use crate::cache::CacheStats;
use crate::orchestrator::Orchestrator;
use crate::types::{
    CircuitState, GenerationRequest, GenerationResult, HealthStatus, Provider, ProviderStatus,
};

fn default_use_cache() -> bool {
    true
}

fn default_count() -> usize {
    3
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(flatten)]
    pub request: GenerationRequest,
    #[serde(default)]
    pub preferred_provider: Option<Provider>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateMultipleBody {
    #[serde(flatten)]
    pub request: GenerationRequest,
    #[serde(default = "default_count")]
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_ratio: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub providers: BTreeMap<Provider, ProviderStatus>,
    pub cache: CacheHealth,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub provider: Provider,
    pub circuit_state: CircuitState,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// POST /quotes/generate
pub async fn generate(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerationResult>, ApiError> {
    let req = body(payload)?;
    let result = orchestrator
        .generate(&req.request, req.preferred_provider, req.use_cache)
        .await?;
    Ok(Json(result))
}

/// POST /quotes/generate-multiple
pub async fn generate_multiple(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<GenerateMultipleBody>, JsonRejection>,
) -> Result<Json<Vec<GenerationResult>>, ApiError> {
    let req = body(payload)?;
    let results = orchestrator
        .generate_multiple(&req.request, req.count)
        .await?;
    Ok(Json(results))
}

/// GET /ai-service/health
pub async fn health(State(orchestrator): State<Arc<Orchestrator>>) -> Json<HealthResponse> {
    let providers = orchestrator.health_check().await;
    let status = overall_status(providers.values().map(|s| s.status));
    let stats = orchestrator.cache_stats();
    Json(HealthResponse {
        status,
        providers,
        cache: CacheHealth {
            backend: orchestrator.cache_backend(),
            hit_ratio: stats.hit_ratio(),
            stats,
        },
    })
}

/// POST /ai-service/circuit-breaker/reset/{provider}
pub async fn reset_circuit_breaker(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(provider): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let provider: Provider = provider
        .parse()
        .map_err(|e: crate::types::UnknownProvider| ApiError::NotFound(e.to_string()))?;
    if !orchestrator.reset_circuit_breaker(provider) {
        return Err(ApiError::NotFound(format!(
            "provider {} is not configured",
            provider
        )));
    }
    Ok(Json(ResetResponse {
        provider,
        circuit_state: CircuitState::Closed,
    }))
}

/// Healthy only when every provider is; Unavailable when none is usable.
fn overall_status(statuses: impl Iterator<Item = HealthStatus>) -> HealthStatus {
    let statuses: Vec<HealthStatus> = statuses.collect();
    if statuses.is_empty() || statuses.iter().all(|s| *s == HealthStatus::Unavailable) {
        HealthStatus::Unavailable
    } else if statuses.iter().all(|s| *s == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}
