//! Orchestrator behaviour over scripted in-process adapters.

mod common;

use common::{scripted, Behavior, ScriptedAdapter, SilentServer};
use quote_ai::resilience::{CircuitBreakerConfig, RateLimiterConfig};
use quote_ai::{
    CircuitState, GenerationRequest, HealthStatus, Orchestrator, Provider, ProviderErrorKind,
    ServiceConfig, ServiceErrorKind,
};
use std::sync::Arc;
use std::time::Duration;

const GOOD: &str = "Success is the sum of small efforts, repeated with persistence every day.";
const PLAIN: &str = "work hard";

fn request() -> GenerationRequest {
    GenerationRequest::new("success through persistence")
}

#[tokio::test]
async fn test_falls_back_to_next_provider() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::Fail(ProviderErrorKind::Network)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::reply(GOOD)),
        ],
        |b| b,
    );

    let result = orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(result.provider, Provider::Anthropic);
    assert_eq!(result.text, GOOD);
    assert!(!result.cached);
    assert!((0.0..=1.0).contains(&result.quality_score));
    assert_eq!(h[0].calls(), 1);
    assert_eq!(h[1].calls(), 1);

    let usage = orch.usage_stats();
    assert_eq!(usage[&Provider::OpenAi].failures, 1);
    assert_eq!(usage[&Provider::Anthropic].successes, 1);
    assert_eq!(usage[&Provider::Anthropic].tokens, 20);
}

#[tokio::test]
async fn test_adapter_cost_is_never_negative() {
    for bogus in [-1.0, f64::NAN, f64::NEG_INFINITY] {
        let (orch, _) = scripted(
            vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD)).with_cost(bogus)],
            |b| b,
        );
        let result = orch.generate(&request(), None, false).await.unwrap();
        assert_eq!(result.cost, 0.0);
        assert_eq!(orch.usage_stats()[&Provider::OpenAi].cost, 0.0);
    }
}

#[tokio::test]
async fn test_auth_and_quota_errors_fall_back() {
    for kind in [ProviderErrorKind::AuthError, ProviderErrorKind::QuotaExceeded] {
        let (orch, _) = scripted(
            vec![
                ScriptedAdapter::new(Provider::OpenAi, Behavior::Fail(kind)),
                ScriptedAdapter::new(Provider::AzureOpenAi, Behavior::reply(GOOD)),
            ],
            |b| b,
        );
        let result = orch.generate(&request(), None, false).await.unwrap();
        assert_eq!(result.provider, Provider::AzureOpenAi);
    }
}

#[tokio::test]
async fn test_preferred_provider_first() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::reply(GOOD)),
        ],
        |b| b,
    );
    let result = orch
        .generate(&request(), Some(Provider::Anthropic), false)
        .await
        .unwrap();
    assert_eq!(result.provider, Provider::Anthropic);
    assert_eq!(h[0].calls(), 0);
}

#[tokio::test]
async fn test_unconfigured_preferred_provider_ignored() {
    let (orch, _) = scripted(
        vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD))],
        |b| b,
    );
    let result = orch
        .generate(&request(), Some(Provider::AzureOpenAi), false)
        .await
        .unwrap();
    assert_eq!(result.provider, Provider::OpenAi);
}

#[tokio::test]
async fn test_custom_priority_order() {
    let (orch, _) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD)),
            ScriptedAdapter::new(Provider::AzureOpenAi, Behavior::reply(GOOD)),
        ],
        |b| b.with_priority(vec![Provider::AzureOpenAi]),
    );
    assert_eq!(orch.providers(), &[Provider::AzureOpenAi, Provider::OpenAi]);
    let result = orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(result.provider, Provider::AzureOpenAi);
}

#[tokio::test]
async fn test_all_providers_failing_yields_aggregated_error() {
    let (orch, _) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::Fail(ProviderErrorKind::Timeout)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::Fail(ProviderErrorKind::AuthError)),
        ],
        |b| b,
    );
    let err = orch.generate(&request(), None, true).await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::AllProvidersUnavailable));
    let msg = err.to_string();
    assert!(!msg.contains("openai"));
    assert!(!msg.contains("auth"));
}

#[tokio::test]
async fn test_invalid_request_consumes_no_budget() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD))],
        |b| b.with_rate_limits(RateLimiterConfig::new().with_quota(Provider::OpenAi, 1)),
    );

    let bad = [
        GenerationRequest::new("   "),
        request().with_temperature(1.5),
        request().with_max_tokens(0),
    ];
    for r in &bad {
        let err = orch.generate(r, None, true).await.unwrap_err();
        assert_eq!(err.service_kind(), Some(ServiceErrorKind::InvalidRequest));
    }
    assert_eq!(h[0].calls(), 0);
    assert_eq!(orch.usage_stats()[&Provider::OpenAi].requests, 0);
    assert_eq!(orch.cache_stats().misses, 0);

    // the single-slot quota is still available
    assert!(orch.generate(&request(), None, false).await.is_ok());
}

#[tokio::test]
async fn test_rate_limit_boundary_falls_back() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::reply(GOOD)),
        ],
        |b| b.with_rate_limits(RateLimiterConfig::new().with_quota(Provider::OpenAi, 2)),
    );
    for _ in 0..2 {
        let r = orch.generate(&request(), None, false).await.unwrap();
        assert_eq!(r.provider, Provider::OpenAi);
    }
    let r = orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(r.provider, Provider::Anthropic);
    assert_eq!(h[0].calls(), 2);
}

#[tokio::test]
async fn test_rate_limited_provider_keeps_breaker_trial() {
    // OpenAI is half-open but out of quota: its trial slot must be handed back.
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::Fail(ProviderErrorKind::Network)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::reply(GOOD)),
        ],
        |b| {
            b.with_circuit_breaker(
                CircuitBreakerConfig::new()
                    .with_failure_threshold(1)
                    .with_cooldown(Duration::from_millis(30)),
            )
            .with_rate_limits(
                RateLimiterConfig::new()
                    .with_quota(Provider::OpenAi, 1)
                    .with_window(Duration::from_millis(200)),
            )
        },
    );
    orch.generate(&request(), None, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    // breaker admits a trial, limiter rejects, admission released
    orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(h[0].calls(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    h[0].set(Behavior::reply(GOOD));
    let r = orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(r.provider, Provider::OpenAi);
}

#[tokio::test]
async fn test_circuit_opens_after_threshold() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::Fail(ProviderErrorKind::Network)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::reply(GOOD)),
        ],
        |b| {
            b.with_circuit_breaker(
                CircuitBreakerConfig::new()
                    .with_failure_threshold(3)
                    .with_cooldown(Duration::from_secs(60)),
            )
        },
    );
    for _ in 0..6 {
        let r = orch.generate(&request(), None, false).await.unwrap();
        assert_eq!(r.provider, Provider::Anthropic);
    }
    // open circuit means no further network calls
    assert_eq!(h[0].calls(), 3);

    let health = orch.health_check().await;
    assert_eq!(health[&Provider::OpenAi].health.circuit_state, CircuitState::Open);
    assert_eq!(health[&Provider::OpenAi].status, HealthStatus::Degraded);
    assert!(health[&Provider::OpenAi].error.is_some());
}

#[tokio::test]
async fn test_open_preferred_provider_is_skipped() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::Fail(ProviderErrorKind::Network)),
        ],
        |b| b.with_circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(1)),
    );
    orch.generate(&request(), Some(Provider::Anthropic), false)
        .await
        .unwrap();
    assert_eq!(h[1].calls(), 1);

    let r = orch
        .generate(&request(), Some(Provider::Anthropic), false)
        .await
        .unwrap();
    assert_eq!(r.provider, Provider::OpenAi);
    assert_eq!(h[1].calls(), 1);
}

#[tokio::test]
async fn test_half_open_recovery() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(
            Provider::OpenAi,
            Behavior::Fail(ProviderErrorKind::Network),
        )],
        |b| {
            b.with_circuit_breaker(
                CircuitBreakerConfig::new()
                    .with_failure_threshold(1)
                    .with_cooldown(Duration::from_millis(50)),
            )
        },
    );
    assert!(orch.generate(&request(), None, false).await.is_err());
    assert!(orch.generate(&request(), None, false).await.is_err());
    assert_eq!(h[0].calls(), 1);

    h[0].set(Behavior::reply(GOOD));
    tokio::time::sleep(Duration::from_millis(70)).await;
    let r = orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(r.provider, Provider::OpenAi);

    let health = orch.health_check().await;
    assert_eq!(health[&Provider::OpenAi].health.circuit_state, CircuitState::Closed);
    assert_eq!(health[&Provider::OpenAi].status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_reset_circuit_breaker() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(
            Provider::OpenAi,
            Behavior::Fail(ProviderErrorKind::Network),
        )],
        |b| b.with_circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(1)),
    );
    assert!(orch.generate(&request(), None, false).await.is_err());
    h[0].set(Behavior::reply(GOOD));
    assert!(orch.generate(&request(), None, false).await.is_err());

    assert!(orch.reset_circuit_breaker(Provider::OpenAi));
    assert!(!orch.reset_circuit_breaker(Provider::Anthropic));
    assert!(orch.generate(&request(), None, false).await.is_ok());
}

#[tokio::test]
async fn test_cache_hit_skips_providers() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD))],
        |b| b,
    );
    let first = orch.generate(&request(), None, true).await.unwrap();
    let second = orch.generate(&request(), None, true).await.unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.text, second.text);
    assert_eq!(first.request_id, second.request_id);
    assert_eq!(h[0].calls(), 1);

    // equivalent after normalisation
    let spaced = GenerationRequest::new("  success through persistence ");
    assert!(orch.generate(&spaced, None, true).await.unwrap().cached);
    assert_eq!(h[0].calls(), 1);
}

#[tokio::test]
async fn test_cache_bypass_and_invalidate() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD))],
        |b| b,
    );
    orch.generate(&request(), None, true).await.unwrap();
    let bypass = orch.generate(&request(), None, false).await.unwrap();
    assert!(!bypass.cached);
    assert_eq!(h[0].calls(), 2);

    assert!(orch.invalidate(&request()).await);
    assert!(!orch.invalidate(&request()).await);
    let fresh = orch.generate(&request(), None, true).await.unwrap();
    assert!(!fresh.cached);
    assert_eq!(h[0].calls(), 3);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(
            Provider::OpenAi,
            Behavior::Fail(ProviderErrorKind::InvalidResponse),
        )],
        |b| b,
    );
    assert!(orch.generate(&request(), None, true).await.is_err());
    h[0].set(Behavior::reply(GOOD));
    let r = orch.generate(&request(), None, true).await.unwrap();
    assert!(!r.cached);
}

#[tokio::test]
async fn test_identical_concurrent_requests_share_one_call() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD))
            .with_delay(Duration::from_millis(100))],
        |b| b,
    );
    let orch = Arc::new(orch);

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.generate(&request(), None, true).await })
        })
        .collect();
    let mut ids = Vec::new();
    for t in tasks {
        ids.push(t.await.unwrap().unwrap().request_id);
    }
    assert_eq!(h[0].calls(), 1);
    assert!(ids.iter().all(|id| *id == ids[0]));
}

#[tokio::test]
async fn test_followers_receive_leader_failure() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(
            Provider::OpenAi,
            Behavior::Fail(ProviderErrorKind::Network),
        )
        .with_delay(Duration::from_millis(100))],
        |b| b,
    );
    let orch = Arc::new(orch);
    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.generate(&request(), None, true).await })
        })
        .collect();
    for t in tasks {
        let err = t.await.unwrap().unwrap_err();
        assert_eq!(err.service_kind(), Some(ServiceErrorKind::AllProvidersUnavailable));
    }
    assert_eq!(h[0].calls(), 1);
}

#[tokio::test]
async fn test_cancelled_call_is_not_an_outcome() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::Hang)],
        |b| b.with_circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(1)),
    );

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), orch.generate(&request(), None, true))
            .await;
    assert!(cancelled.is_err());
    assert_eq!(h[0].calls(), 1);

    let health = orch.health_check().await;
    let openai = &health[&Provider::OpenAi];
    assert_eq!(openai.health.circuit_state, CircuitState::Closed);
    assert_eq!(openai.health.failure_count, 0);
    assert_eq!(openai.usage.successes, 0);
    assert_eq!(openai.usage.failures, 0);

    // the abandoned leader no longer blocks the key
    h[0].set(Behavior::reply(GOOD));
    let r = orch.generate(&request(), None, true).await.unwrap();
    assert!(!r.cached);
}

#[tokio::test]
async fn test_cancelled_half_open_trial_is_released() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(
            Provider::OpenAi,
            Behavior::Fail(ProviderErrorKind::Network),
        )],
        |b| {
            b.with_circuit_breaker(
                CircuitBreakerConfig::new()
                    .with_failure_threshold(1)
                    .with_cooldown(Duration::from_millis(20)),
            )
        },
    );
    assert!(orch.generate(&request(), None, false).await.is_err());
    tokio::time::sleep(Duration::from_millis(30)).await;

    h[0].set(Behavior::Hang);
    let cancelled =
        tokio::time::timeout(Duration::from_millis(30), orch.generate(&request(), None, false))
            .await;
    assert!(cancelled.is_err());

    h[0].set(Behavior::reply(GOOD));
    let r = orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(r.provider, Provider::OpenAi);
    assert_eq!(h[0].calls(), 3);
}

#[tokio::test]
async fn test_attempt_timeout_counts_as_failure() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::Hang),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::reply(GOOD)),
        ],
        |b| b.with_request_timeout(Duration::from_millis(50)),
    );
    let r = orch.generate(&request(), None, false).await.unwrap();
    assert_eq!(r.provider, Provider::Anthropic);
    assert_eq!(h[0].calls(), 1);
    assert_eq!(orch.usage_stats()[&Provider::OpenAi].failures, 1);
}

#[tokio::test]
async fn test_generate_multiple_sorted_and_diverse() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(PLAIN)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::reply(GOOD)),
        ],
        |b| b,
    );
    let results = orch.generate_multiple(&request(), 4).await.unwrap();
    assert_eq!(results.len(), 4);
    assert!(results
        .windows(2)
        .all(|w| w[0].quality_score >= w[1].quality_score));
    assert_eq!(results[0].text, GOOD);
    assert_eq!(h[0].calls(), 2);
    assert_eq!(h[1].calls(), 2);
    assert!(results.iter().all(|r| !r.cached));
}

#[tokio::test]
async fn test_generate_multiple_count_bounds() {
    let (orch, h) = scripted(
        vec![ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD))],
        |b| b,
    );
    for count in [0, 11] {
        let err = orch.generate_multiple(&request(), count).await.unwrap_err();
        assert_eq!(err.service_kind(), Some(ServiceErrorKind::InvalidRequest));
    }
    assert_eq!(h[0].calls(), 0);
    assert_eq!(orch.generate_multiple(&request(), 10).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_generate_multiple_all_failing() {
    let (orch, _) = scripted(
        vec![ScriptedAdapter::new(
            Provider::OpenAi,
            Behavior::Fail(ProviderErrorKind::Network),
        )],
        |b| b,
    );
    let err = orch.generate_multiple(&request(), 3).await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::AllProvidersUnavailable));
}

#[tokio::test]
async fn test_health_check_statuses_and_no_side_effects() {
    let (orch, h) = scripted(
        vec![
            ScriptedAdapter::new(Provider::OpenAi, Behavior::reply(GOOD)),
            ScriptedAdapter::new(Provider::Anthropic, Behavior::Fail(ProviderErrorKind::Network)),
            ScriptedAdapter::new(Provider::AzureOpenAi, Behavior::reply(GOOD)),
        ],
        |b| b.with_circuit_breaker(CircuitBreakerConfig::new().with_failure_threshold(1)),
    );
    orch.generate(&request(), Some(Provider::Anthropic), false)
        .await
        .unwrap();
    h[1].set_ping(false);
    h[2].set_ping(false);

    let before = orch.health_check().await;
    let after = orch.health_check().await;

    assert_eq!(before[&Provider::OpenAi].status, HealthStatus::Healthy);
    assert_eq!(before[&Provider::Anthropic].status, HealthStatus::Unavailable);
    assert_eq!(before[&Provider::AzureOpenAi].status, HealthStatus::Degraded);
    assert!(before[&Provider::OpenAi].latency_ms.is_some());
    assert!(before[&Provider::AzureOpenAi].latency_ms.is_none());
    assert_eq!(before[&Provider::OpenAi].model, "scripted-model");

    for p in [Provider::OpenAi, Provider::Anthropic, Provider::AzureOpenAi] {
        assert_eq!(
            before[&p].health.requests_in_window,
            after[&p].health.requests_in_window
        );
        assert_eq!(before[&p].health.circuit_state, after[&p].health.circuit_state);
    }
    assert_eq!(before[&Provider::OpenAi].health.requests_in_window, 1);
    assert_eq!(h[0].calls(), 1);
}

#[tokio::test]
async fn test_builder_requires_an_adapter() {
    assert!(quote_ai::Orchestrator::builder().build().is_err());
}

#[tokio::test]
async fn test_configured_adapter_retries_timeouts_within_attempt_budget() {
    let silent = SilentServer::start().await;
    let raw = format!(
        r#"
providers:
  openai:
    api_key: sk-test
    base_url: {}
  anthropic:
    enabled: false
  azure_openai:
    enabled: false
request_timeout_secs: 1
retry:
  max_attempts: 3
  base_delay_ms: 10
"#,
        silent.base_url
    );
    let cfg = ServiceConfig::from_yaml_str(&raw).unwrap();
    let orch = Orchestrator::from_config(&cfg).await.unwrap();

    let err = orch.generate(&request(), None, false).await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::AllProvidersUnavailable));
    assert_eq!(silent.connections(), 3);
    let usage = &orch.usage_stats()[&Provider::OpenAi];
    assert_eq!(usage.requests, 1);
    assert_eq!(usage.failures, 1);
}
