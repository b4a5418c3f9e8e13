use crate::types::Provider;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterSnapshot {
    pub quota: u32,
    pub window_ms: u64,
    pub requests_in_window: u32,
    /// Time until the oldest admitted request leaves the window (ms), if at quota.
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub window: Duration,
    /// Requests per window; providers missing here use their default quota.
    pub quotas: HashMap<Provider, u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            quotas: HashMap::new(),
        }
    }
}

impl RateLimiterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_quota(mut self, provider: Provider, quota: u32) -> Self {
        self.quotas.insert(provider, quota);
        self
    }

    pub fn quota_for(&self, provider: Provider) -> u32 {
        self.quotas
            .get(&provider)
            .copied()
            .unwrap_or_else(|| provider.default_quota())
    }
}

/// Sliding-window counter for one provider.
pub struct SlidingWindow {
    quota: u32,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            quota,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(quota as usize)),
        }
    }

    fn prune(window: Duration, admitted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = admitted.front() {
            if now.duration_since(oldest) >= window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Admit one request if the window has room. A rejection leaves the window untouched.
    pub async fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut admitted = self.admitted.lock().await;
        Self::prune(self.window, &mut admitted, now);
        if admitted.len() as u64 >= u64::from(self.quota) {
            return false;
        }
        admitted.push_back(now);
        true
    }

    pub async fn snapshot(&self) -> RateLimiterSnapshot {
        let now = Instant::now();
        let mut admitted = self.admitted.lock().await;
        Self::prune(self.window, &mut admitted, now);
        let in_window = admitted.len() as u32;
        let retry_after_ms = if in_window >= self.quota {
            admitted.front().map(|&oldest| {
                self.window
                    .saturating_sub(now.duration_since(oldest))
                    .as_millis() as u64
            })
        } else {
            None
        };
        RateLimiterSnapshot {
            quota: self.quota,
            window_ms: self.window.as_millis() as u64,
            requests_in_window: in_window,
            retry_after_ms,
        }
    }
}

/// Per-provider sliding-window rate limiter.
///
/// Each provider has its own lock; there is no global critical section.
pub struct RateLimiter {
    windows: HashMap<Provider, SlidingWindow>,
}

impl RateLimiter {
    pub fn new(providers: impl IntoIterator<Item = Provider>, cfg: &RateLimiterConfig) -> Self {
        let windows = providers
            .into_iter()
            .map(|p| (p, SlidingWindow::new(cfg.quota_for(p), cfg.window)))
            .collect();
        Self { windows }
    }

    /// Admit one request for `provider`. Unconfigured providers are never admitted.
    pub async fn allow(&self, provider: Provider) -> bool {
        let Some(window) = self.windows.get(&provider) else {
            return false;
        };
        let ok = window.try_acquire().await;
        if !ok {
            debug!(provider = %provider, quota = window.quota, "rate limit reached");
        }
        ok
    }

    pub async fn snapshot(&self, provider: Provider) -> Option<RateLimiterSnapshot> {
        match self.windows.get(&provider) {
            Some(w) => Some(w.snapshot().await),
            None => None,
        }
    }

    pub async fn requests_in_window(&self, provider: Provider) -> u32 {
        self.snapshot(provider)
            .await
            .map(|s| s.requests_in_window)
            .unwrap_or(0)
    }
}
