//! # steadfast-core
//!
//! Deterministic building blocks for resilient operation execution.
//!
//! This crate holds everything that does not need an async runtime:
//! - Retry and circuit configuration
//! - The backoff calculator (exponential growth plus bounded jitter)
//! - Failure classification for retry decisions
//! - The circuit breaker state machine
//!
//! ## Key Guarantees
//!
//! 1. **No hidden clock**: the state machine takes `now` on every call
//! 2. **Bounded delays**: backoff never exceeds `max_delay`
//! 3. **Typed classification**: retryability is read from fields, not messages
//!
//! The async executor, circuit registry and facade live in `steadfast-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Instant;
//! use steadfast_core::{Admission, CircuitConfig, CircuitMachine, CircuitState};
//!
//! let config = CircuitConfig { failure_threshold: 1, ..Default::default() };
//! let mut machine = CircuitMachine::new();
//! let now = Instant::now();
//!
//! machine.record_failure(Admission::Normal, now, &config);
//! assert_eq!(machine.state(), CircuitState::Open);
//! assert!(machine.try_acquire(now).is_err());
//! ```

pub mod backoff;
pub mod circuit;
pub mod config;
pub mod error;
pub mod failure;

// Re-export main types at crate root
pub use backoff::{backoff_delay, backoff_delay_with, backoff_schedule};
pub use circuit::{Admission, CircuitMachine, CircuitSnapshot, CircuitState, Transition};
pub use config::{CircuitConfig, ConfigError, RetryConfig};
pub use error::{CircuitOpenError, ResilienceError};
pub use failure::{
    is_retryable, message_is_transient, Classify, OperationFailure, RETRYABLE_STATUSES,
};
