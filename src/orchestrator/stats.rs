//! Per-provider usage counters.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{Provider, UsageStats};

// Cost is accumulated in nano-dollars so it fits an atomic integer.
const COST_SCALE: f64 = 1_000_000_000.0;

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    tokens: AtomicU64,
    cost_nanos: AtomicU64,
}

pub(crate) struct UsageTracker {
    counters: HashMap<Provider, Counters>,
}

impl UsageTracker {
    pub(crate) fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            counters: providers
                .into_iter()
                .map(|p| (p, Counters::default()))
                .collect(),
        }
    }

    pub(crate) fn record_attempt(&self, provider: Provider) {
        if let Some(c) = self.counters.get(&provider) {
            c.requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_success(&self, provider: Provider, tokens: u32, cost: f64) {
        if let Some(c) = self.counters.get(&provider) {
            c.successes.fetch_add(1, Ordering::Relaxed);
            c.tokens.fetch_add(u64::from(tokens), Ordering::Relaxed);
            let nanos = (cost.max(0.0) * COST_SCALE).round();
            if nanos.is_finite() {
                c.cost_nanos.fetch_add(nanos as u64, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_failure(&self, provider: Provider) {
        if let Some(c) = self.counters.get(&provider) {
            c.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn get(&self, provider: Provider) -> UsageStats {
        match self.counters.get(&provider) {
            Some(c) => UsageStats {
                requests: c.requests.load(Ordering::Relaxed),
                successes: c.successes.load(Ordering::Relaxed),
                failures: c.failures.load(Ordering::Relaxed),
                tokens: c.tokens.load(Ordering::Relaxed),
                cost: c.cost_nanos.load(Ordering::Relaxed) as f64 / COST_SCALE,
            },
            None => UsageStats::default(),
        }
    }

    pub(crate) fn all(&self) -> BTreeMap<Provider, UsageStats> {
        self.counters.keys().map(|&p| (p, self.get(p))).collect()
    }
}
