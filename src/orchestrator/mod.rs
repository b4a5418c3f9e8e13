//! # Orchestrator
//!
//! Coordinates one generation across the configured providers:
//!
//! 1. validate the request (no cache, limiter or breaker interaction on failure)
//! 2. serve from cache when possible, deduplicating identical concurrent misses
//! 3. walk the providers in priority order, each guarded by its circuit breaker
//!    and rate limiter, with a per-attempt timeout around the adapter call
//! 4. score, cache and return the first success, or a single aggregated error
//!
//! Per-provider failure details are logged and surfaced through
//! [`Orchestrator::health_check`], never through the error path.

mod builder;
mod single_flight;
mod stats;

pub use builder::OrchestratorBuilder;

use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKeyGenerator, CacheManager, CacheStats};
use crate::error::{ErrorContext, ProviderError, ServiceErrorKind};
use crate::providers::{ProviderAdapter, ProviderOutput};
use crate::quality::QualityScorer;
use crate::resilience::{CircuitBreakers, RateLimiter};
use crate::types::{
    CircuitState, GenerationRequest, GenerationResult, HealthStatus, Provider, ProviderStatus,
    UsageStats,
};
use crate::{Error, Result};

use single_flight::{Flight, SingleFlight};
use stats::UsageTracker;

/// Upper bound for [`Orchestrator::generate_multiple`].
pub const MAX_VARIATIONS: usize = 10;

pub struct Orchestrator {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
    /// Configured providers in fallback order.
    priority: Vec<Provider>,
    breakers: CircuitBreakers,
    limiter: RateLimiter,
    cache: CacheManager,
    keys: CacheKeyGenerator,
    scorer: QualityScorer,
    usage: UsageTracker,
    inflight: SingleFlight,
    last_errors: Mutex<HashMap<Provider, String>>,
    request_timeout: Duration,
    health_timeout: Duration,
}

/// Holds a breaker admission for the duration of one provider call.
///
/// If the call is abandoned (the future is dropped) the admission is handed
/// back without recording an outcome.
struct AttemptGuard<'a> {
    breakers: &'a CircuitBreakers,
    provider: Provider,
    settled: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(breakers: &'a CircuitBreakers, provider: Provider) -> Self {
        Self {
            breakers,
            provider,
            settled: false,
        }
    }

    fn success(mut self) {
        self.settled = true;
        self.breakers.record_success(self.provider);
    }

    fn failure(mut self) {
        self.settled = true;
        self.breakers.record_failure(self.provider);
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breakers.release(self.provider);
        }
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Configured providers in fallback order.
    pub fn providers(&self) -> &[Provider] {
        &self.priority
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }

    /// Generate one quote.
    ///
    /// `preferred` is tried first when configured and its circuit is not open.
    /// With `use_cache` the result may come from (and is written to) the cache.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        preferred: Option<Provider>,
        use_cache: bool,
    ) -> Result<GenerationResult> {
        request.validate()?;

        if !use_cache {
            return self.execute(request, preferred).await;
        }

        let key = self.keys.generate(request);
        if let Some(hit) = self.cache.get::<GenerationResult>(&key).await {
            debug!(key = %key, provider = %hit.provider, "cache hit");
            return Ok(hit.mark_cached());
        }

        match self.inflight.join(key.as_str()) {
            Flight::Follower(mut rx) => match rx.recv().await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(kind)) => Err(Error::from_service_kind(kind)),
                Err(_) => {
                    debug!(key = %key, "in-flight leader abandoned, generating independently");
                    let outcome = self.execute(request, preferred).await;
                    if let Ok(result) = &outcome {
                        self.cache.set(&key, result).await;
                    }
                    outcome
                }
            },
            Flight::Leader(flight) => {
                // a previous leader may have filled the cache between our miss and join
                if let Some(hit) = self.cache.get::<GenerationResult>(&key).await {
                    let hit = hit.mark_cached();
                    flight.complete(Ok(hit.clone()));
                    return Ok(hit);
                }
                let outcome = self.execute(request, preferred).await;
                if let Ok(result) = &outcome {
                    self.cache.set(&key, result).await;
                }
                flight.complete(match &outcome {
                    Ok(result) => Ok(result.clone()),
                    Err(e) => Err(e
                        .service_kind()
                        .unwrap_or(ServiceErrorKind::AllProvidersUnavailable)),
                });
                outcome
            }
        }
    }

    /// Generate `count` variations concurrently, best first.
    ///
    /// Bypasses the cache. The i-th generation prefers provider `i % n` of the
    /// priority list so variations come from different providers when possible.
    pub async fn generate_multiple(
        &self,
        request: &GenerationRequest,
        count: usize,
    ) -> Result<Vec<GenerationResult>> {
        request.validate()?;
        if count == 0 || count > MAX_VARIATIONS {
            return Err(Error::invalid_request(
                format!("count must be in 1..={}", MAX_VARIATIONS),
                ErrorContext::new()
                    .with_field_path("count")
                    .with_details(format!("got {}", count))
                    .with_source("request_validator"),
            ));
        }
        if self.priority.is_empty() {
            return Err(Error::all_providers_unavailable());
        }

        let n = self.priority.len();
        let attempts = (0..count).map(|i| self.execute(request, Some(self.priority[i % n])));
        let mut results: Vec<GenerationResult> = join_all(attempts)
            .await
            .into_iter()
            .filter_map(|r| r.ok())
            .collect();

        if results.is_empty() {
            return Err(Error::all_providers_unavailable());
        }
        results.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
        Ok(results)
    }

    /// Ping every configured provider and report its resilience state.
    ///
    /// Pings bypass the breaker and limiter and leave both untouched.
    pub async fn health_check(&self) -> BTreeMap<Provider, ProviderStatus> {
        let checks = self.priority.iter().map(|&p| self.provider_status(p));
        join_all(checks)
            .await
            .into_iter()
            .flatten()
            .map(|s| (s.provider, s))
            .collect()
    }

    async fn provider_status(&self, provider: Provider) -> Option<ProviderStatus> {
        let adapter = self.adapters.get(&provider)?;
        let started = Instant::now();
        let ping = match tokio::time::timeout(self.health_timeout, adapter.ping()).await {
            Ok(r) => r,
            Err(_) => Err(ProviderError::timeout(provider, "health check timed out")),
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let requests_in_window = self.limiter.requests_in_window(provider).await;
        let health = self.breakers.health(provider, requests_in_window)?;
        let status = match (&ping, health.circuit_state) {
            (Ok(()), CircuitState::Closed) => HealthStatus::Healthy,
            (Ok(()), _) => HealthStatus::Degraded,
            (Err(_), CircuitState::Closed) => HealthStatus::Degraded,
            (Err(_), _) => HealthStatus::Unavailable,
        };
        let error = match &ping {
            Err(e) => Some(e.to_string()),
            Ok(()) => self.last_error(provider),
        };

        Some(ProviderStatus {
            provider,
            model: adapter.model().to_string(),
            status,
            latency_ms: ping.is_ok().then_some(latency_ms),
            error,
            health,
            usage: self.usage.get(provider),
        })
    }

    /// Operator override: force the provider's circuit closed.
    /// Returns `false` when the provider is not configured.
    pub fn reset_circuit_breaker(&self, provider: Provider) -> bool {
        self.breakers.reset(provider)
    }

    /// Drop the cached result for `request`, if any.
    pub async fn invalidate(&self, request: &GenerationRequest) -> bool {
        self.cache.delete(&self.keys.generate(request)).await
    }

    pub fn usage_stats(&self) -> BTreeMap<Provider, UsageStats> {
        self.usage.all()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend_name()
    }

    fn attempt_order(&self, preferred: Option<Provider>) -> Vec<Provider> {
        let first = preferred.filter(|&p| {
            self.is_configured(p) && self.breakers.state(p) != Some(CircuitState::Open)
        });
        let mut order = Vec::with_capacity(self.priority.len());
        order.extend(first);
        order.extend(self.priority.iter().copied().filter(|&p| Some(p) != first));
        order
    }

    fn last_error(&self, provider: Provider) -> Option<String> {
        self.last_errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&provider)
            .cloned()
    }

    fn note_failure(&self, err: &ProviderError) {
        self.usage.record_failure(err.provider);
        warn!(
            provider = %err.provider,
            kind = %err.kind,
            error = %err.message,
            "provider attempt failed, falling back"
        );
        self.last_errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(err.provider, err.to_string());
    }

    /// Fallback walk without any cache interaction.
    async fn execute(
        &self,
        request: &GenerationRequest,
        preferred: Option<Provider>,
    ) -> Result<GenerationResult> {
        for provider in self.attempt_order(preferred) {
            let Some(adapter) = self.adapters.get(&provider) else {
                continue;
            };
            if !self.breakers.allow_request(provider) {
                debug!(provider = %provider, "circuit open, skipping provider");
                continue;
            }
            let attempt = AttemptGuard::new(&self.breakers, provider);
            if !self.limiter.allow(provider).await {
                debug!(provider = %provider, "rate limited, skipping provider");
                // dropping the guard returns the breaker admission
                continue;
            }

            self.usage.record_attempt(provider);
            let outcome = tokio::time::timeout(self.request_timeout, adapter.generate(request))
                .await
                .unwrap_or_else(|_| {
                    Err(ProviderError::timeout(
                        provider,
                        format!("no response within {:?}", self.request_timeout),
                    ))
                });

            match outcome {
                Ok(output) => {
                    attempt.success();
                    return Ok(self.finish(provider, output, request));
                }
                Err(e) => {
                    attempt.failure();
                    self.note_failure(&e);
                }
            }
        }

        error!(
            providers = self.priority.len(),
            "all AI providers failed or were unavailable"
        );
        Err(Error::all_providers_unavailable())
    }

    fn finish(
        &self,
        provider: Provider,
        output: ProviderOutput,
        request: &GenerationRequest,
    ) -> GenerationResult {
        let quality_score = self.scorer.score(&output.text, request);
        let cost = if output.cost.is_finite() {
            output.cost.max(0.0)
        } else {
            0.0
        };
        self.usage.record_success(provider, output.tokens_used, cost);
        info!(
            provider = %provider,
            model = %output.model,
            tokens = output.tokens_used,
            cost,
            quality = quality_score,
            latency_ms = output.latency.as_millis() as u64,
            "quote generated"
        );
        GenerationResult {
            text: output.text,
            provider,
            model: output.model,
            tokens_used: output.tokens_used,
            cost,
            quality_score,
            latency: output.latency,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
            cached: false,
        }
    }
}
