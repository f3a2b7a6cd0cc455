//! Retry executor.
//!
//! # Responsibilities
//! - Invoke an operation until it succeeds, the predicate rejects its
//!   failure, or `max_retries` retries have been spent
//! - Sleep for the computed backoff between attempts (suspends, never blocks)
//! - Emit one diagnostic record per retry
//!
//! The last failure is returned unchanged, so callers see the same failure
//! shape as a call that was never retried.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use steadfast_core::{backoff_delay, is_retryable, Classify, RetryConfig};

/// Diagnostic record emitted before each retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// 0-based index of the attempt that just failed
    pub attempt: u32,

    /// Backoff applied before the next attempt
    pub delay: Duration,

    /// Rendered failure of the attempt
    pub error: String,
}

type Observer = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Runs an operation under a retry policy.
#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    observer: Option<Observer>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryExecutor {
    /// Create an executor for the given config.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Receive a [`RetryEvent`] before every retry sleep.
    pub fn with_observer(mut self, observer: impl Fn(&RetryEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// The retry config in use.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run with the default retry predicate ([`is_retryable`]).
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        self.run_if(operation, is_retryable::<E>).await
    }

    /// Run, retrying only failures for which `predicate` returns true.
    pub async fn run_if<F, Fut, T, E, P>(&self, mut operation: F, predicate: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt: u32 = 0;

        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(attempts = attempt + 1, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !predicate(&err) {
                tracing::debug!(attempt, error = %err, "Failure is not retryable");
                return Err(err);
            }

            if attempt >= self.config.max_retries {
                tracing::warn!(
                    attempts = attempt + 1,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(err);
            }

            let delay = backoff_delay(attempt, &self.config);
            tracing::warn!(
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Operation failed, retrying"
            );

            if let Some(observer) = &self.observer {
                observer(&RetryEvent {
                    attempt,
                    delay,
                    error: err.to_string(),
                });
            }
            drop(err);

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Retry `operation` with the default predicate.
pub async fn retry<F, Fut, T, E>(operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display,
{
    RetryExecutor::new(config.clone()).run(operation).await
}

/// Retry `operation`, consulting `predicate` to decide whether a failure is retryable.
pub async fn retry_if<F, Fut, T, E, P>(operation: F, config: &RetryConfig, predicate: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: Fn(&E) -> bool,
{
    RetryExecutor::new(config.clone())
        .run_if(operation, predicate)
        .await
}
