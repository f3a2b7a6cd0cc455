//! Registry of circuit breakers keyed by dependency name.
//!
//! Entries are created on first use and never removed, so the registry is
//! bounded by the number of distinct dependency names, not by request volume.
//! The first caller's config wins for a given name.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use steadfast_core::{CircuitConfig, CircuitSnapshot};

use super::circuit_breaker::CircuitBreaker;

/// Name → breaker map shared by every call site of one composition root.
#[derive(Debug, Default)]
pub struct CircuitRegistry {
    breakers: RwLock<BTreeMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the breaker for `name`, creating it with `config` if absent.
    ///
    /// An existing breaker keeps its original config.
    pub fn get_or_create(&self, name: &str, config: &CircuitConfig) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().get(name) {
            if breaker.config() != config {
                tracing::debug!(
                    circuit = name,
                    "Circuit already registered, ignoring differing config"
                );
            }
            return Arc::clone(breaker);
        }

        // Re-check under the write lock: another caller may have created it
        let mut breakers = self.breakers.write();
        let breaker = breakers.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(
                circuit = name,
                failure_threshold = config.failure_threshold,
                reset_timeout_ms = config.reset_timeout.as_millis() as u64,
                "Registering circuit breaker"
            );
            Arc::new(CircuitBreaker::new(name, config.clone()))
        });
        Arc::clone(breaker)
    }

    /// Get the breaker for `name`, if registered.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.breakers.read().keys().cloned().collect()
    }

    /// Number of registered breakers.
    pub fn len(&self) -> usize {
        self.breakers.read().len()
    }

    /// Whether no breaker has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.breakers.read().is_empty()
    }

    /// Point-in-time state of every breaker, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.snapshot()))
            .collect()
    }

    /// Force every breaker closed. Entries are kept.
    pub fn reset_all(&self) {
        for breaker in self.breakers.read().values() {
            breaker.reset();
        }
    }
}
