//! Retry and circuit configuration.
//!
//! Both configs are plain data: every field has a default, so a partial YAML
//! or JSON document deserializes into a complete config. Durations are
//! serialized as integer milliseconds.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised when a config violates its invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("base_delay ({base:?}) must not exceed max_delay ({max:?})")]
    DelayOrder { base: Duration, max: Duration },

    #[error("exponential_base must be a finite number >= 1, got {0}")]
    ExponentialBase(f64),

    #[error("failure_threshold must be at least 1")]
    ZeroThreshold,

    #[error("invalid config for circuit '{name}': {source}")]
    Circuit {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Retry configuration for a single call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,

    /// Ceiling applied after jitter
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,

    /// Growth factor per attempt
    pub exponential_base: f64,

    /// Upper bound of the uniform jitter added to each delay
    #[serde(rename = "jitter_max_ms", with = "duration_ms")]
    pub jitter_max: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            exponential_base: 2.0,
            jitter_max: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Check the config invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay > self.max_delay {
            return Err(ConfigError::DelayOrder {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err(ConfigError::ExponentialBase(self.exponential_base));
        }
        Ok(())
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,

    /// How long the circuit stays open before a probe is admitted
    #[serde(rename = "reset_timeout_ms", with = "duration_ms")]
    pub reset_timeout: Duration,

    /// Reserved for windowed failure-rate accounting; currently unused
    #[serde(rename = "monitoring_period_ms", with = "duration_ms")]
    pub monitoring_period: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
            monitoring_period: Duration::from_millis(10_000),
        }
    }
}

impl CircuitConfig {
    /// Check the config invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(())
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
