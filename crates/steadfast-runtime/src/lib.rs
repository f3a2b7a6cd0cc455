//! # steadfast-runtime
//!
//! Async resilience layer on tokio.
//!
//! Wraps any fallible async operation with:
//! - Retry using exponential backoff with jitter
//! - Per-dependency circuit breaking
//! - A diagnostics snapshot of every breaker
//!
//! All state is process-local and in memory. Circuit state is not shared
//! across processes and does not survive a restart.
//!
//! ## Example
//!
//! ```rust,ignore
//! use steadfast_runtime::{OperationFailure, Resilience, ResilienceConfig};
//!
//! let resilience = Resilience::new(ResilienceConfig::from_yaml_file("steadfast.yaml")?);
//!
//! let body = resilience
//!     .with_full_resilience(
//!         || async { fetch_inventory().await.map_err(OperationFailure::from_message) },
//!         "inventory",
//!         None,
//!         None,
//!     )
//!     .await?;
//!
//! println!("{}", serde_json::to_string_pretty(&resilience.circuit_breaker_status())?);
//! ```

pub mod config;
pub mod facade;
pub mod resilience;

pub use config::{ConfigLoadError, ResilienceConfig};
pub use facade::Resilience;
pub use resilience::{retry, retry_if, CircuitBreaker, CircuitRegistry, RetryEvent, RetryExecutor};

// Re-export the core types callers need alongside the runtime
pub use steadfast_core::{
    is_retryable, CircuitConfig, CircuitOpenError, CircuitSnapshot, CircuitState, Classify,
    OperationFailure, ResilienceError, RetryConfig,
};
