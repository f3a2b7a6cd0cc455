//! Circuit breaker state machine.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - HalfOpen: one probe call tests whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → HalfOpen: first call at or after next_attempt (admitted as the probe)
//! HalfOpen → Closed: probe succeeds
//! HalfOpen → Open: probe fails
//! ```
//!
//! The machine is pure: every time-dependent method takes `now`, so it has no
//! clock of its own. Callers serialize access (the runtime wraps it in a mutex).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::CircuitConfig;

/// State of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation
    #[default]
    Closed,

    /// Failing fast until the reset timeout elapses
    Open,

    /// Probing for recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(label)
    }
}

/// How a call was let through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed, ordinary call
    Normal,

    /// The single recovery probe of a half-open circuit
    Probe,
}

/// A state change caused by recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Closed → Open after `failures` consecutive failures
    Opened { failures: u32 },

    /// HalfOpen → Open after a failed probe
    Reopened,

    /// HalfOpen → Closed after a successful probe
    Recovered,
}

/// Point-in-time view of one circuit, for diagnostics endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    /// Current state
    pub state: CircuitState,

    /// Consecutive failures recorded
    pub failures: u32,

    /// Wall-clock time at which an open circuit admits its next probe
    pub next_attempt: Option<DateTime<Utc>>,
}

/// Consecutive-failure circuit state machine.
#[derive(Debug, Clone, Default)]
pub struct CircuitMachine {
    state: CircuitState,
    consecutive_failures: u32,
    next_attempt: Option<Instant>,
    probe_in_flight: bool,
}

impl CircuitMachine {
    /// Create a closed circuit with no recorded failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, without evaluating the reset deadline.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Consecutive failures recorded so far.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Instant at which an open circuit admits its next probe.
    pub fn next_attempt(&self) -> Option<Instant> {
        self.next_attempt
    }

    /// Decide whether a call may proceed at `now`.
    ///
    /// Returns the admission kind, or the remaining wait when the call must be
    /// rejected. An open circuit whose deadline has passed moves to HalfOpen
    /// and admits this call as the probe; while that probe is in flight every
    /// other caller is rejected with a zero wait.
    pub fn try_acquire(&mut self, now: Instant) -> Result<Admission, Duration> {
        match self.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                let deadline = self.next_attempt.unwrap_or(now);
                if now < deadline {
                    Err(deadline - now)
                } else {
                    self.state = CircuitState::HalfOpen;
                    self.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    Err(Duration::ZERO)
                } else {
                    self.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
        }
    }

    /// Record a successful call admitted as `admission`.
    pub fn record_success(&mut self, admission: Admission) -> Option<Transition> {
        match (self.state, admission) {
            (CircuitState::Closed, _) => {
                self.consecutive_failures = 0;
                None
            }
            (CircuitState::HalfOpen, Admission::Probe) => {
                self.close();
                Some(Transition::Recovered)
            }
            // A call admitted before the circuit tripped does not vote on recovery
            _ => None,
        }
    }

    /// Record a failed call admitted as `admission`.
    pub fn record_failure(
        &mut self,
        admission: Admission,
        now: Instant,
        config: &CircuitConfig,
    ) -> Option<Transition> {
        match (self.state, admission) {
            (CircuitState::Closed, _) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= config.failure_threshold {
                    self.trip(now, config);
                    Some(Transition::Opened {
                        failures: self.consecutive_failures,
                    })
                } else {
                    None
                }
            }
            (CircuitState::HalfOpen, Admission::Probe) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.trip(now, config);
                Some(Transition::Reopened)
            }
            _ => None,
        }
    }

    /// Release the probe slot of a half-open circuit without an outcome.
    ///
    /// Used when the probe call was cancelled; the next caller becomes the probe.
    pub fn abandon_probe(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.probe_in_flight = false;
        }
    }

    /// Force the circuit closed and clear its failure count.
    pub fn reset(&mut self) {
        self.close();
    }

    /// Diagnostic view, mapping the monotonic deadline onto wall-clock time.
    pub fn snapshot(&self, now: Instant) -> CircuitSnapshot {
        let next_attempt = self.next_attempt.map(|deadline| {
            let remaining = deadline.saturating_duration_since(now);
            let remaining = chrono::Duration::from_std(remaining).unwrap_or(chrono::Duration::MAX);
            Utc::now()
                .checked_add_signed(remaining)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        });

        CircuitSnapshot {
            state: self.state,
            failures: self.consecutive_failures,
            next_attempt,
        }
    }

    fn trip(&mut self, now: Instant, config: &CircuitConfig) {
        self.state = CircuitState::Open;
        self.probe_in_flight = false;
        self.next_attempt = Some(deadline(now, config.reset_timeout));
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.next_attempt = None;
        self.probe_in_flight = false;
    }
}

fn deadline(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .or_else(|| now.checked_add(Duration::from_secs(u64::from(u32::MAX))))
        .unwrap_or(now)
}
