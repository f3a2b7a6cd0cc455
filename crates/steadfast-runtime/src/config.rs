//! Runtime configuration loaded from YAML.
//!
//! ```yaml
//! retry:
//!   max_retries: 2
//!   base_delay_ms: 250
//! circuit:
//!   failure_threshold: 3
//! circuits:
//!   payments:
//!     failure_threshold: 1
//!     reset_timeout_ms: 5000
//! ```
//!
//! Every section is optional. Per-name entries under `circuits` are complete
//! configs on their own: omitted fields take the built-in defaults, not the
//! values of the `circuit` section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use steadfast_core::{CircuitConfig, ConfigError, RetryConfig};

/// Errors that can occur when loading a config.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Config validation failed: {0}")]
    ValidationError(#[from] ConfigError),
}

/// Defaults for every call routed through a [`crate::Resilience`] facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Retry policy used when a call passes none
    pub retry: RetryConfig,

    /// Circuit policy used for names without an override
    pub circuit: CircuitConfig,

    /// Per-dependency circuit overrides
    pub circuits: BTreeMap<String, CircuitConfig>,
}

impl ResilienceConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check every nested config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        self.circuit.validate()?;
        for (name, circuit) in &self.circuits {
            circuit.validate().map_err(|source| ConfigError::Circuit {
                name: name.clone(),
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    /// Circuit config for `name`: its override if present, else the default section.
    pub fn circuit_for(&self, name: &str) -> &CircuitConfig {
        self.circuits.get(name).unwrap_or(&self.circuit)
    }
}
