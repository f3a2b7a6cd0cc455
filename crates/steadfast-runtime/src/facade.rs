//! Resilience facade.
//!
//! Composes the retry executor and the circuit registry behind one handle.
//! Construct it once at the composition root and clone it into call sites;
//! clones share the same registry.
//!
//! # Execution Flow (`with_full_resilience`)
//! 1. Look up or create the named breaker
//! 2. Fail fast if the circuit is open
//! 3. Run the operation under the retry policy
//! 4. Record the final outcome on the breaker (one outcome per call)

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use steadfast_core::{CircuitConfig, CircuitSnapshot, Classify, ResilienceError, RetryConfig};

use crate::config::ResilienceConfig;
use crate::resilience::{CircuitRegistry, RetryExecutor};

/// Entry point wrapping fallible async operations with retry and circuit breaking.
#[derive(Debug, Clone)]
pub struct Resilience {
    registry: Arc<CircuitRegistry>,
    config: Arc<ResilienceConfig>,
}

impl Default for Resilience {
    fn default() -> Self {
        Self::new(ResilienceConfig::default())
    }
}

impl Resilience {
    /// Create a facade with its own empty registry.
    pub fn new(config: ResilienceConfig) -> Self {
        Self::with_registry(config, Arc::new(CircuitRegistry::new()))
    }

    /// Create a facade over an existing registry.
    pub fn with_registry(config: ResilienceConfig, registry: Arc<CircuitRegistry>) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    /// The circuit registry backing this facade.
    pub fn registry(&self) -> &Arc<CircuitRegistry> {
        &self.registry
    }

    /// Default policies.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Retry `operation` with the default retry predicate.
    ///
    /// `retry` overrides the facade's default retry policy for this call.
    pub async fn with_retry<F, Fut, T, E>(
        &self,
        operation: F,
        retry: Option<&RetryConfig>,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        self.executor(retry).run(operation).await
    }

    /// Retry `operation`, deciding retryability with `predicate`.
    pub async fn with_retry_if<F, Fut, T, E, P>(
        &self,
        operation: F,
        retry: Option<&RetryConfig>,
        predicate: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
    {
        self.executor(retry).run_if(operation, predicate).await
    }

    /// Run `operation` once through the breaker registered as `name`.
    ///
    /// `circuit` is only used if this call creates the breaker; otherwise the
    /// per-name override from the config applies, then the default section.
    pub async fn with_circuit_breaker<F, Fut, T, E>(
        &self,
        operation: F,
        name: &str,
        circuit: Option<&CircuitConfig>,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let config = circuit.unwrap_or_else(|| self.config.circuit_for(name));
        let breaker = self.registry.get_or_create(name, config);
        breaker.execute(operation).await
    }

    /// Retry inside the circuit breaker.
    ///
    /// The breaker observes only the final outcome after retries, so a
    /// transient blip absorbed by the retry layer never counts against it.
    pub async fn with_full_resilience<F, Fut, T, E>(
        &self,
        operation: F,
        name: &str,
        retry: Option<&RetryConfig>,
        circuit: Option<&CircuitConfig>,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let executor = self.executor(retry);
        self.with_circuit_breaker(
            move || async move { executor.run(operation).await },
            name,
            circuit,
        )
        .await
    }

    /// Diagnostic snapshot of every registered breaker.
    pub fn circuit_breaker_status(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.registry.snapshot()
    }

    fn executor(&self, retry: Option<&RetryConfig>) -> RetryExecutor {
        RetryExecutor::new(retry.unwrap_or(&self.config.retry).clone())
    }
}
