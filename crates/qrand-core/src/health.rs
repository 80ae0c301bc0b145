//! Per-source health ledger.
//!
//! Quarantine is derived from a circuit breaker keyed by source name instead
//! of a hand-edited flag, so a source that failed repeatedly drops out of the
//! active catalog and comes back once its open window elapses.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

/// Point-in-time health of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub source: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

/// Circuit breakers for every source seen so far.
#[derive(Debug, Default)]
pub struct SourceHealth {
    config: CircuitBreakerConfig,
    breakers: Mutex<BTreeMap<String, Arc<CircuitBreaker>>>,
}

impl SourceHealth {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(BTreeMap::new()),
        }
    }

    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// True while the source's breaker rejects requests.
    pub fn is_quarantined(&self, source: &str) -> bool {
        self.existing(source)
            .is_some_and(|breaker| !breaker.allow_request())
    }

    pub fn record_success(&self, source: &str) {
        self.breaker(source).record_success();
    }

    pub fn record_failure(&self, source: &str) {
        self.breaker(source).record_failure();
    }

    /// Pre-load a failure streak recorded by earlier runs.
    pub fn seed_failures(&self, source: &str, streak: u32, since_last_failure: Duration) {
        if streak == 0 {
            return;
        }
        self.breaker(source)
            .seed_failures(streak, since_last_failure);
    }

    pub fn state(&self, source: &str) -> CircuitState {
        self.existing(source)
            .map(|breaker| breaker.state())
            .unwrap_or(CircuitState::Closed)
    }

    pub fn snapshot(&self) -> Vec<HealthSnapshot> {
        let breakers = self
            .breakers
            .lock()
            .expect("source health lock is not poisoned");
        breakers
            .iter()
            .map(|(source, breaker)| HealthSnapshot {
                source: source.clone(),
                state: breaker.state(),
                consecutive_failures: breaker.consecutive_failures(),
            })
            .collect()
    }

    fn existing(&self, source: &str) -> Option<Arc<CircuitBreaker>> {
        let breakers = self
            .breakers
            .lock()
            .expect("source health lock is not poisoned");
        breakers.get(source).cloned()
    }

    fn breaker(&self, source: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self
            .breakers
            .lock()
            .expect("source health lock is not poisoned");
        Arc::clone(
            breakers
                .entry(source.to_owned())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config))),
        )
    }
}
