use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use super::single_flight::SingleFlight;
use super::stats::UsageTracker;
use super::Orchestrator;
use crate::cache::{CacheConfig, CacheKeyGenerator, CacheManager, MemoryCache, RedisCache};
use crate::config::ServiceConfig;
use crate::error::ErrorContext;
use crate::providers::{
    driver_for, AzureOpenAiDriver, HttpAdapter, Pricing, ProviderAdapter, ProviderDriver,
};
use crate::quality::{QualityScorer, ScoringWeights};
use crate::resilience::{CircuitBreakerConfig, CircuitBreakers, RateLimiter, RateLimiterConfig};
use crate::transport::{HttpTransport, TransportConfig};
use crate::types::Provider;
use crate::{Error, Result};

/// Builder for [`Orchestrator`]. Retry is configured on each adapter, not here.
pub struct OrchestratorBuilder {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    priority: Vec<Provider>,
    cache: Option<CacheManager>,
    breaker: CircuitBreakerConfig,
    limits: RateLimiterConfig,
    scoring: ScoringWeights,
    key_salt: Option<String>,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            priority: Provider::ALL.to_vec(),
            cache: None,
            breaker: CircuitBreakerConfig::default(),
            limits: RateLimiterConfig::default(),
            scoring: ScoringWeights::default(),
            key_salt: None,
            request_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
        }
    }

    /// Register an adapter. A later adapter for the same provider replaces an earlier one.
    pub fn with_adapter(self, adapter: impl ProviderAdapter + 'static) -> Self {
        self.with_shared_adapter(Arc::new(adapter))
    }

    pub fn with_shared_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        let provider = adapter.provider();
        self.adapters.retain(|a| a.provider() != provider);
        self.adapters.push(adapter);
        self
    }

    /// Fallback order. Configured providers not listed are appended in default order.
    pub fn with_priority(mut self, priority: Vec<Provider>) -> Self {
        self.priority = priority;
        self
    }

    /// Defaults to an in-process cache with 1000 entries and a one hour TTL.
    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_circuit_breaker(mut self, cfg: CircuitBreakerConfig) -> Self {
        self.breaker = cfg;
        self
    }

    pub fn with_rate_limits(mut self, cfg: RateLimiterConfig) -> Self {
        self.limits = cfg;
        self
    }

    pub fn with_scoring_weights(mut self, weights: ScoringWeights) -> Self {
        self.scoring = weights;
        self
    }

    /// Salt mixed into every cache key; bump it to orphan old entries.
    pub fn with_cache_key_salt(mut self, salt: impl Into<String>) -> Self {
        self.key_salt = Some(salt.into());
        self
    }

    /// Upper bound on one provider attempt, retries included.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        if self.adapters.is_empty() {
            return Err(Error::configuration_with_context(
                "no AI providers configured",
                ErrorContext::new()
                    .with_details("set an API key for at least one provider")
                    .with_source("orchestrator_builder"),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "request timeout must be greater than zero",
                ErrorContext::new()
                    .with_field_path("request_timeout")
                    .with_source("orchestrator_builder"),
            ));
        }

        let adapters: HashMap<Provider, Arc<dyn ProviderAdapter>> = self
            .adapters
            .into_iter()
            .map(|a| (a.provider(), a))
            .collect();

        let mut priority: Vec<Provider> = Vec::with_capacity(adapters.len());
        for p in self.priority.into_iter().chain(Provider::ALL) {
            if adapters.contains_key(&p) && !priority.contains(&p) {
                priority.push(p);
            }
        }

        let mut keys = CacheKeyGenerator::new();
        if let Some(salt) = self.key_salt {
            keys = keys.with_salt(salt);
        }

        let cache = self
            .cache
            .unwrap_or_else(|| CacheManager::in_memory(CacheConfig::default(), 1000));

        info!(
            providers = ?priority,
            cache = cache.backend_name(),
            "orchestrator ready"
        );

        Ok(Orchestrator {
            breakers: CircuitBreakers::new(priority.iter().copied(), self.breaker),
            limiter: RateLimiter::new(priority.iter().copied(), &self.limits),
            usage: UsageTracker::new(priority.iter().copied()),
            adapters,
            priority,
            cache,
            keys,
            scorer: QualityScorer::new(self.scoring),
            inflight: SingleFlight::new(),
            last_errors: Mutex::new(HashMap::new()),
            request_timeout: self.request_timeout,
            health_timeout: self.health_timeout,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Build HTTP adapters and the cache from configuration.
    ///
    /// Providers without an API key (or, for Azure, without an endpoint) are
    /// skipped with a warning. A Redis connection failure degrades to the
    /// in-process cache.
    pub async fn from_config(cfg: &ServiceConfig) -> Result<Self> {
        cfg.validate()?;

        let transport_cfg = TransportConfig::default().with_timeout(cfg.provider_call_timeout());
        let mut limits = RateLimiterConfig::new()
            .with_window(Duration::from_secs(cfg.rate_limit_window_secs));
        let mut builder = OrchestratorBuilder::new()
            .with_priority(cfg.priority.clone())
            .with_circuit_breaker(
                CircuitBreakerConfig::new()
                    .with_failure_threshold(cfg.circuit_breaker.failure_threshold)
                    .with_failure_window(Duration::from_secs(
                        cfg.circuit_breaker.failure_window_secs,
                    ))
                    .with_cooldown(Duration::from_secs(cfg.circuit_breaker.cooldown_secs)),
            )
            .with_scoring_weights(cfg.scoring)
            .with_request_timeout(cfg.request_timeout())
            .with_health_timeout(cfg.health_check_timeout());

        for provider in Provider::ALL {
            let pc = cfg.provider(provider);
            if !pc.is_enabled() {
                info!(provider = %provider, "provider disabled by configuration");
                continue;
            }
            let Some(api_key) = HttpTransport::resolve_api_key(provider, pc.api_key.as_deref())
            else {
                warn!(provider = %provider, "no API key found, provider skipped");
                continue;
            };

            let driver: Box<dyn ProviderDriver> = match provider {
                Provider::AzureOpenAi => {
                    let defaults = AzureOpenAiDriver::default();
                    Box::new(AzureOpenAiDriver::new(
                        pc.deployment
                            .clone()
                            .unwrap_or_else(|| defaults.deployment().to_string()),
                        pc.api_version
                            .clone()
                            .unwrap_or_else(|| crate::providers::azure::DEFAULT_API_VERSION.into()),
                    ))
                }
                _ => driver_for(provider),
            };
            let Some(base_url) = pc
                .base_url
                .clone()
                .or_else(|| driver.default_base_url().map(String::from))
            else {
                warn!(provider = %provider, "no endpoint configured, provider skipped");
                continue;
            };

            let transport = HttpTransport::new(provider, &base_url, &transport_cfg)?;
            let mut adapter =
                HttpAdapter::new(driver, transport, &api_key).with_retry(cfg.retry.policy());
            if let Some(model) = &pc.model {
                adapter = adapter.with_model(model.clone());
            }
            if let Some(rate) = pc.cost_per_1k_tokens {
                adapter = adapter.with_pricing(Pricing::new(rate));
            }
            if let Some(rpm) = pc.requests_per_minute {
                limits = limits.with_quota(provider, rpm);
            }
            builder = builder.with_adapter(adapter);
        }

        let cache_cfg = CacheConfig::new()
            .with_ttl(Duration::from_secs(cfg.cache.ttl_secs))
            .with_enabled(cfg.cache.enabled)
            .with_key_prefix(cfg.cache.key_prefix.clone());
        let primary = match &cfg.cache.redis_url {
            Some(url) if cfg.cache.enabled => {
                match RedisCache::connect(url, cfg.cache.key_prefix.clone()).await {
                    Ok(redis) => Some(Box::new(redis) as Box<dyn crate::cache::CacheBackend>),
                    Err(e) => {
                        warn!(error = %e, "redis unavailable, using in-process cache only");
                        None
                    }
                }
            }
            _ => None,
        };
        let cache = CacheManager::new(
            cache_cfg,
            primary,
            Box::new(MemoryCache::new(cfg.cache.max_entries)),
        );

        builder.with_rate_limits(limits).with_cache(cache).build()
    }
}
