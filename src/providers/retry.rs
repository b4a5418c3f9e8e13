//! Bounded exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let cap = self.max_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(cap))
    }

    /// Sum of every sleep a fully exhausted [`execute`](Self::execute) performs.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|a| self.backoff(a))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the attempts run out.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        provider = %e.provider,
                        kind = %e.kind,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "transient provider error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
