//! Resilience patterns for steadfast-runtime.
//!
//! This module provides:
//! - Retry with exponential backoff and jitter
//! - Circuit breaker to stop calling a failing dependency
//! - A registry holding one breaker per dependency name
//!
//! # Data Flow
//! ```text
//! call → circuit_breaker.rs (fail fast if open)
//!      → retry.rs (invoke, back off, retry while retryable)
//!      → circuit_breaker.rs (record the final outcome)
//! ```

mod circuit_breaker;
mod registry;
mod retry;

pub use circuit_breaker::CircuitBreaker;
pub use registry::CircuitRegistry;
pub use retry::{retry, retry_if, RetryEvent, RetryExecutor};
