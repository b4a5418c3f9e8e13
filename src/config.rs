//! Service configuration: YAML file plus `QUOTE_AI_*` environment overrides.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. YAML file named by `QUOTE_AI_CONFIG` (or passed explicitly)
//! 3. Environment variables
//!
//! API keys are not required here; they are resolved per provider when the
//! orchestrator is built (explicit value, OS keyring, then `<PROVIDER>_API_KEY`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::ErrorContext;
use crate::providers::RetryPolicy;
use crate::quality::ScoringWeights;
use crate::types::Provider;

/// Longest accepted cache TTL (30 days).
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Disabled providers are never built, even when a key is available.
    pub enabled: Option<bool>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub requests_per_minute: Option<u32>,
    pub cost_per_1k_tokens: Option<f64>,
    /// Azure OpenAI only.
    pub deployment: Option<String>,
    /// Azure OpenAI only.
    pub api_version: Option<String>,
}

impl ProviderConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
    pub max_entries: usize,
    pub key_prefix: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: None,
            ttl_secs: 3600,
            max_entries: 1000,
            key_prefix: "quote-ai:".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub failure_window_secs: u64,
    pub cooldown_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window_secs: 60,
            cooldown_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub providers: BTreeMap<Provider, ProviderConfig>,
    /// Fallback order. Providers missing here are tried last, in default order.
    pub priority: Vec<Provider>,
    pub cache: CacheSettings,
    pub circuit_breaker: BreakerSettings,
    pub rate_limit_window_secs: u64,
    pub retry: RetrySettings,
    /// Budget for one provider attempt, retries and backoff included.
    pub request_timeout_secs: u64,
    /// Timeout of a single HTTP call. Derived from the attempt budget when unset.
    pub provider_call_timeout_ms: Option<u64>,
    pub health_check_timeout_secs: u64,
    pub scoring: ScoringWeights,
    pub bind: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            providers: BTreeMap::new(),
            priority: Provider::ALL.to_vec(),
            cache: CacheSettings::default(),
            circuit_breaker: BreakerSettings::default(),
            rate_limit_window_secs: 60,
            retry: RetrySettings::default(),
            request_timeout_secs: 30,
            provider_call_timeout_ms: None,
            health_check_timeout_secs: 5,
            scoring: ScoringWeights::default(),
            bind: "0.0.0.0:8000".into(),
        }
    }
}

impl ServiceConfig {
    /// Defaults, then the file named by `QUOTE_AI_CONFIG`, then the environment.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var("QUOTE_AI_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply `QUOTE_AI_*` and provider variables through `lookup` (normally `std::env::var`).
    /// Unparseable numeric values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("QUOTE_AI_REDIS_URL") {
            self.cache.redis_url = Some(v);
        }
        if let Some(v) = get("QUOTE_AI_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = get("QUOTE_AI_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = v;
        }
        if let Some(v) = get("QUOTE_AI_CALL_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.provider_call_timeout_ms = Some(v);
        }
        if let Some(v) = get("QUOTE_AI_BIND") {
            self.bind = v;
        }
        if let Some(v) = get("QUOTE_AI_BREAKER_FAILURE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.circuit_breaker.failure_threshold = v;
        }
        if let Some(v) = get("QUOTE_AI_BREAKER_COOLDOWN_SECS").and_then(|v| v.parse().ok()) {
            self.circuit_breaker.cooldown_secs = v;
        }
        if let Some(v) = get("AZURE_OPENAI_ENDPOINT") {
            let azure = self.providers.entry(Provider::AzureOpenAi).or_default();
            if azure.base_url.is_none() {
                azure.base_url = Some(v);
            }
        }
    }

    pub fn provider(&self, provider: Provider) -> ProviderConfig {
        self.providers.get(&provider).cloned().unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Per-call HTTP timeout. Unless set explicitly, every retry attempt and
    /// its backoff fit inside [`request_timeout`](Self::request_timeout) with a
    /// tenth of the budget to spare.
    pub fn provider_call_timeout(&self) -> Duration {
        if let Some(ms) = self.provider_call_timeout_ms {
            return Duration::from_millis(ms);
        }
        let policy = self.retry.policy();
        let budget = self.request_timeout().saturating_sub(policy.total_backoff());
        budget / 10 * 9 / policy.max_attempts
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(invalid("must be greater than zero", "request_timeout_secs"));
        }
        if self.health_check_timeout_secs == 0 {
            return Err(invalid("must be greater than zero", "health_check_timeout_secs"));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(invalid("must be greater than zero", "rate_limit_window_secs"));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(invalid("must be greater than zero", "circuit_breaker.failure_threshold"));
        }
        if self.circuit_breaker.failure_window_secs == 0 {
            return Err(invalid("must be greater than zero", "circuit_breaker.failure_window_secs"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("must be at least 1", "retry.max_attempts"));
        }
        let backoff = self.retry.policy().total_backoff();
        if backoff >= self.request_timeout() {
            return Err(invalid(
                "retry backoff leaves no time for provider calls within request_timeout_secs",
                "retry.base_delay_ms",
            ));
        }
        let call = self.provider_call_timeout();
        if call.is_zero() {
            return Err(invalid("must be greater than zero", "provider_call_timeout_ms"));
        }
        let attempts = call
            .checked_mul(self.retry.max_attempts)
            .and_then(|d| d.checked_add(backoff));
        if attempts.map_or(true, |d| d > self.request_timeout()) {
            return Err(invalid(
                "all retry attempts must fit within request_timeout_secs",
                "provider_call_timeout_ms",
            ));
        }
        if self.cache.ttl_secs == 0 || self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(invalid(
                format!("must be between 1 and {}", MAX_CACHE_TTL_SECS),
                "cache.ttl_secs",
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(invalid("must be greater than zero", "cache.max_entries"));
        }
        if let Some(url) = &self.cache.redis_url {
            let parsed = Url::parse(url)
                .map_err(|e| invalid(format!("invalid URL: {}", e), "cache.redis_url"))?;
            if !matches!(parsed.scheme(), "redis" | "rediss") {
                return Err(invalid("scheme must be redis or rediss", "cache.redis_url"));
            }
        }
        for (provider, pc) in &self.providers {
            if let Some(base) = &pc.base_url {
                let parsed = Url::parse(base).map_err(|e| {
                    invalid(
                        format!("invalid URL: {}", e),
                        format!("providers.{}.base_url", provider),
                    )
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(invalid(
                        "scheme must be http or https",
                        format!("providers.{}.base_url", provider),
                    ));
                }
            }
            if let Some(rate) = pc.cost_per_1k_tokens {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(invalid(
                        "must be a non-negative number",
                        format!("providers.{}.cost_per_1k_tokens", provider),
                    ));
                }
            }
        }
        Url::parse(&format!("http://{}", self.bind))
            .map_err(|e| invalid(format!("invalid bind address: {}", e), "bind"))?;
        Ok(())
    }
}

fn invalid(msg: impl Into<String>, field: impl Into<String>) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("config_loader"),
    )
}
