//! Generation results and provider health snapshots.

use super::provider::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// The outcome of one successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub provider: Provider,
    pub model: String,
    pub tokens_used: u32,
    /// USD, derived from `tokens_used` and the provider's rate.
    pub cost: f64,
    /// Heuristic score in `[0, 1]`.
    pub quality_score: f64,
    #[serde(rename = "latency_ms", with = "duration_ms")]
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    #[serde(default)]
    pub cached: bool,
}

impl GenerationResult {
    /// Copy of this result flagged as served from cache.
    pub fn mark_cached(mut self) -> Self {
        self.cached = true;
        self
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        })
    }
}

/// Point-in-time view of one provider's resilience state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: Provider,
    pub requests_in_window: u32,
    pub failure_count: u32,
    pub circuit_state: CircuitState,
    pub last_failure: Option<DateTime<Utc>>,
}

/// Overall status reported by the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unavailable,
}

/// Per-provider usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub tokens: u64,
    pub cost: f64,
}

/// Health-check entry for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub provider: Provider,
    pub model: String,
    pub status: HealthStatus,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
    pub health: ProviderHealth,
    pub usage: UsageStats,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GenerationResult {
        GenerationResult {
            text: "Keep going.".into(),
            provider: Provider::Anthropic,
            model: "claude-3-haiku".into(),
            tokens_used: 42,
            cost: 0.000126,
            quality_score: 0.8,
            latency: Duration::from_millis(1234),
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
            cached: false,
        }
    }

    #[test]
    fn test_latency_serialized_as_millis() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["latency_ms"], 1234);
        assert_eq!(v["provider"], "anthropic");
        assert!(v.get("latency").is_none());
    }

    #[test]
    fn test_cache_payload_survives_serde() {
        let r = sample();
        let bytes = serde_json::to_vec(&r).unwrap();
        let back: GenerationResult = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.request_id, r.request_id);
        assert_eq!(back.latency, r.latency);
        assert!(!back.cached);
        assert!(back.mark_cached().cached);
    }
}
