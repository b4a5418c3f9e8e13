//! Deduplication of identical concurrent cache misses.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ServiceErrorKind;
use crate::types::GenerationResult;

pub(crate) type Outcome = Result<GenerationResult, ServiceErrorKind>;

pub(crate) enum Flight<'a> {
    /// First caller for the key: must run the generation and publish the outcome.
    Leader(FlightGuard<'a>),
    /// Someone else is already generating; wait for their outcome.
    Follower(broadcast::Receiver<Outcome>),
}

#[derive(Default)]
pub(crate) struct SingleFlight {
    inflight: Mutex<HashMap<String, broadcast::Sender<Outcome>>>,
}

impl SingleFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Outcome>>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn join(&self, key: &str) -> Flight<'_> {
        let mut inflight = self.lock();
        if let Some(tx) = inflight.get(key) {
            debug!(key = key, "joining in-flight generation");
            return Flight::Follower(tx.subscribe());
        }
        let (tx, _) = broadcast::channel(1);
        inflight.insert(key.to_string(), tx.clone());
        Flight::Leader(FlightGuard {
            owner: self,
            key: key.to_string(),
            tx: Some(tx),
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Leader's handle. Dropping it without [`complete`](Self::complete) closes the
/// channel, and waiting followers fall back to generating on their own.
pub(crate) struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    tx: Option<broadcast::Sender<Outcome>>,
}

impl FlightGuard<'_> {
    pub(crate) fn complete(mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            self.owner.lock().remove(&self.key);
            // no receivers is fine
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            self.owner.lock().remove(&self.key);
        }
    }
}
