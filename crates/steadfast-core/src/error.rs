//! Errors surfaced by the resilience layer.

use std::time::Duration;
use thiserror::Error;

use crate::failure::Classify;

/// A call rejected by an open circuit. The operation was never invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("circuit '{name}' is open, retry in {retry_after:?}")]
pub struct CircuitOpenError {
    /// Name of the circuit that rejected the call
    pub name: String,

    /// Time until the circuit admits a probe (zero while a probe is in flight)
    pub retry_after: Duration,
}

/// Outcome of a call through a circuit breaker.
///
/// Retry exhaustion is not a separate variant: the last attempt's failure is
/// returned unchanged in `Operation`.
#[derive(Error, Debug)]
pub enum ResilienceError<E> {
    /// The wrapped operation's own failure
    #[error(transparent)]
    Operation(E),

    /// Rejected without invoking the operation
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),
}

impl<E> ResilienceError<E> {
    /// Whether the call was rejected by an open circuit.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen(_))
    }

    /// The operation's failure, if the operation ran.
    pub fn into_operation(self) -> Option<E> {
        match self {
            ResilienceError::Operation(e) => Some(e),
            ResilienceError::CircuitOpen(_) => None,
        }
    }

    /// Borrow the operation's failure, if the operation ran.
    pub fn as_operation(&self) -> Option<&E> {
        match self {
            ResilienceError::Operation(e) => Some(e),
            ResilienceError::CircuitOpen(_) => None,
        }
    }
}

// Circuit rejections are never retried, so an outer retry loop stops on them.
impl<E: Classify> Classify for ResilienceError<E> {
    fn is_transient(&self) -> bool {
        self.as_operation().is_some_and(Classify::is_transient)
    }

    fn http_status(&self) -> Option<u16> {
        self.as_operation().and_then(Classify::http_status)
    }
}
