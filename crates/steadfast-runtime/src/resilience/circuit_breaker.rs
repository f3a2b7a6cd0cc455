//! Circuit breaker to prevent hammering a failing dependency.
//!
//! Wraps the [`CircuitMachine`] from steadfast-core in a mutex and drives it
//! from the outcome of each call. One breaker guards one named dependency.
//!
//! The mutex is never held across an `.await`: the gate check and the outcome
//! recording are separate short critical sections around the operation.

use parking_lot::Mutex;
use std::future::Future;

use steadfast_core::{
    Admission, CircuitConfig, CircuitMachine, CircuitOpenError, CircuitSnapshot, CircuitState,
    ResilienceError, Transition,
};

/// Circuit breaker for a single named dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    machine: Mutex<CircuitMachine>,
}

impl CircuitBreaker {
    /// Create a closed circuit breaker.
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            name: name.into(),
            config,
            machine: Mutex::new(CircuitMachine::new()),
        }
    }

    /// Name of the guarded dependency.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Config the breaker was created with.
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.machine.lock().state()
    }

    /// Consecutive failures recorded.
    pub fn consecutive_failures(&self) -> u32 {
        self.machine.lock().consecutive_failures()
    }

    /// Point-in-time diagnostic view.
    pub fn snapshot(&self) -> CircuitSnapshot {
        self.machine.lock().snapshot(now())
    }

    /// Force the circuit closed.
    pub fn reset(&self) {
        self.machine.lock().reset();
        tracing::info!(circuit = %self.name, "Circuit manually reset");
    }

    /// Execute `operation` through the breaker.
    ///
    /// Fails fast with [`ResilienceError::CircuitOpen`] without calling the
    /// operation when the circuit is open; otherwise runs it, records the
    /// outcome and passes the result through.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit()?;
        let mut probe = ProbeGuard {
            breaker: self,
            armed: admission == Admission::Probe,
        };

        let result = operation().await;
        probe.armed = false;

        match result {
            Ok(value) => {
                let transition = self.machine.lock().record_success(admission);
                self.log_transition(transition);
                Ok(value)
            }
            Err(err) => {
                let transition = self
                    .machine
                    .lock()
                    .record_failure(admission, now(), &self.config);
                self.log_transition(transition);
                Err(ResilienceError::Operation(err))
            }
        }
    }

    fn admit(&self) -> Result<Admission, CircuitOpenError> {
        let decision = self.machine.lock().try_acquire(now());
        match decision {
            Ok(Admission::Probe) => {
                tracing::info!(circuit = %self.name, "Circuit half-open, admitting recovery probe");
                Ok(Admission::Probe)
            }
            Ok(admission) => Ok(admission),
            Err(retry_after) => {
                tracing::debug!(
                    circuit = %self.name,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Circuit open, failing fast"
                );
                Err(CircuitOpenError {
                    name: self.name.clone(),
                    retry_after,
                })
            }
        }
    }

    fn log_transition(&self, transition: Option<Transition>) {
        match transition {
            Some(Transition::Opened { failures }) => tracing::warn!(
                circuit = %self.name,
                failures,
                reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
                "Circuit opened after repeated failures"
            ),
            Some(Transition::Reopened) => tracing::warn!(
                circuit = %self.name,
                "Circuit reopened after failed recovery probe"
            ),
            Some(Transition::Recovered) => tracing::info!(
                circuit = %self.name,
                "Circuit closed after successful recovery"
            ),
            None => {}
        }
    }
}

/// Releases the half-open probe slot if the probe future is dropped early.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.machine.lock().abandon_probe();
            tracing::debug!(circuit = %self.breaker.name, "Recovery probe cancelled");
        }
    }
}

/// Monotonic now, following tokio's clock so paused-time tests stay deterministic.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
