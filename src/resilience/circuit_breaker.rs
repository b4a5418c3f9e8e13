use crate::types::{CircuitState, Provider, ProviderHealth};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
    /// Failures of the current run still inside the trailing window.
    pub consecutive_failures: u32,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
    pub last_failure: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    /// Failures older than this no longer count towards the threshold.
    pub failure_window: Duration,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[derive(Debug)]
struct State {
    circuit: CircuitState,
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    last_failure: Option<DateTime<Utc>>,
}

impl State {
    fn closed() -> Self {
        Self {
            circuit: CircuitState::Closed,
            failures: VecDeque::new(),
            opened_at: None,
            trial_in_flight: false,
            last_failure: None,
        }
    }

    fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(&oldest) = self.failures.front() {
            if now.duration_since(oldest) >= window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn open(&mut self, now: Instant) {
        self.circuit = CircuitState::Open;
        self.opened_at = Some(now);
        self.trial_in_flight = false;
    }
}

/// Three-state circuit breaker for a single provider.
///
/// - CLOSED counts consecutive failures inside a trailing window and opens at the threshold
/// - OPEN rejects until the cooldown elapses, then the next `allow_request` moves to HALF_OPEN
/// - HALF_OPEN admits exactly one trial; its outcome closes or re-opens the circuit
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State::closed()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    // A poisoned lock only means another thread panicked mid-update; the state
    // itself is always left consistent, so keep using it.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a call may proceed. Transitions OPEN → HALF_OPEN once the cooldown has elapsed.
    pub fn allow_request(&self) -> bool {
        let mut st = self.lock();
        match st.circuit {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = st
                    .opened_at
                    .map(|at| at.elapsed() >= self.cfg.cooldown)
                    .unwrap_or(true);
                if cooled {
                    st.circuit = CircuitState::HalfOpen;
                    st.trial_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if st.trial_in_flight {
                    false
                } else {
                    st.trial_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut st = self.lock();
        match st.circuit {
            CircuitState::Closed => st.failures.clear(),
            CircuitState::HalfOpen => {
                st.circuit = CircuitState::Closed;
                st.failures.clear();
                st.opened_at = None;
                st.trial_in_flight = false;
            }
            // a call admitted before the circuit opened; its success does not close it
            CircuitState::Open => {}
        }
    }

    /// Returns `true` when this failure opened the circuit.
    pub fn record_failure(&self) -> bool {
        let now = Instant::now();
        let mut st = self.lock();
        st.last_failure = Some(Utc::now());
        match st.circuit {
            CircuitState::Closed => {
                st.prune(self.cfg.failure_window, now);
                st.failures.push_back(now);
                if st.failures.len() as u64 >= u64::from(self.cfg.failure_threshold.max(1)) {
                    st.open(now);
                    return true;
                }
                false
            }
            CircuitState::HalfOpen => {
                st.open(now);
                true
            }
            CircuitState::Open => false,
        }
    }

    /// Give back an admission that was never used. No outcome is recorded.
    pub fn release(&self) {
        let mut st = self.lock();
        if st.circuit == CircuitState::HalfOpen {
            st.trial_in_flight = false;
        }
    }

    /// Operator override: force CLOSED and forget the failure history.
    pub fn reset(&self) {
        let mut st = self.lock();
        let last_failure = st.last_failure;
        *st = State::closed();
        st.last_failure = last_failure;
    }

    /// Current state without triggering any transition.
    pub fn state(&self) -> CircuitState {
        self.lock().circuit
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let now = Instant::now();
        let mut st = self.lock();
        if st.circuit == CircuitState::Closed {
            st.prune(self.cfg.failure_window, now);
        }
        let open_remaining_ms = match (st.circuit, st.opened_at) {
            (CircuitState::Open, Some(at)) => {
                let until = at + self.cfg.cooldown;
                if until > now {
                    Some((until - now).as_millis() as u64)
                } else {
                    Some(0)
                }
            }
            _ => None,
        };
        CircuitBreakerSnapshot {
            state: st.circuit,
            failure_threshold: self.cfg.failure_threshold,
            cooldown_ms: self.cfg.cooldown.as_millis() as u64,
            consecutive_failures: st.failures.len() as u32,
            open_remaining_ms,
            last_failure: st.last_failure,
        }
    }
}

/// One breaker per configured provider.
pub struct CircuitBreakers {
    breakers: HashMap<Provider, CircuitBreaker>,
}

impl CircuitBreakers {
    pub fn new(providers: impl IntoIterator<Item = Provider>, cfg: CircuitBreakerConfig) -> Self {
        let breakers = providers
            .into_iter()
            .map(|p| (p, CircuitBreaker::new(cfg.clone())))
            .collect();
        Self { breakers }
    }

    pub fn get(&self, provider: Provider) -> Option<&CircuitBreaker> {
        self.breakers.get(&provider)
    }

    /// Unconfigured providers are never admitted.
    pub fn allow_request(&self, provider: Provider) -> bool {
        self.breakers
            .get(&provider)
            .map(|b| b.allow_request())
            .unwrap_or(false)
    }

    pub fn record_success(&self, provider: Provider) {
        if let Some(b) = self.breakers.get(&provider) {
            if b.state() == CircuitState::HalfOpen {
                info!(provider = %provider, "circuit closed after successful trial");
            }
            b.record_success();
        }
    }

    pub fn record_failure(&self, provider: Provider) {
        if let Some(b) = self.breakers.get(&provider) {
            if b.record_failure() {
                warn!(
                    provider = %provider,
                    cooldown_ms = b.config().cooldown.as_millis() as u64,
                    "circuit opened"
                );
            }
        }
    }

    pub fn release(&self, provider: Provider) {
        if let Some(b) = self.breakers.get(&provider) {
            b.release();
        }
    }

    /// Returns `false` if the provider has no breaker.
    pub fn reset(&self, provider: Provider) -> bool {
        match self.breakers.get(&provider) {
            Some(b) => {
                b.reset();
                info!(provider = %provider, "circuit manually reset");
                true
            }
            None => false,
        }
    }

    pub fn state(&self, provider: Provider) -> Option<CircuitState> {
        self.breakers.get(&provider).map(|b| b.state())
    }

    pub fn snapshot(&self, provider: Provider) -> Option<CircuitBreakerSnapshot> {
        self.breakers.get(&provider).map(|b| b.snapshot())
    }

    /// Health view; `requests_in_window` is filled in by the caller from the limiter.
    pub fn health(&self, provider: Provider, requests_in_window: u32) -> Option<ProviderHealth> {
        self.snapshot(provider).map(|s| ProviderHealth {
            provider,
            requests_in_window,
            failure_count: s.consecutive_failures,
            circuit_state: s.state,
            last_failure: s.last_failure,
        })
    }
}
