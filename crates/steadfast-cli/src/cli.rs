//! Command-line arguments.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use steadfast_runtime::ResilienceConfig;

#[derive(Parser, Debug)]
#[command(name = "steadfast")]
#[command(about = "Run commands under retry with backoff", long_about = None)]
#[command(version)]
pub struct Cli {
    /// YAML config file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command, retrying failed exits with backoff
    Exec(ExecArgs),

    /// Validate and print the effective config as YAML
    Config(RetryArgs),

    /// Print the jitter-free backoff schedule
    Backoff(RetryArgs),
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Exit codes treated as transient (every non-zero code when empty)
    #[arg(long = "retry-on", value_delimiter = ',')]
    pub retry_on: Vec<i32>,

    #[command(flatten)]
    pub retry: RetryArgs,

    /// Program and arguments to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Flags that override the retry section of the config.
#[derive(Args, Debug, Default, Clone)]
pub struct RetryArgs {
    /// Retries after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Delay before the first retry (e.g. 500ms, 2s)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub base_delay: Option<Duration>,

    /// Upper bound for any single delay
    #[arg(long, value_parser = humantime::parse_duration)]
    pub max_delay: Option<Duration>,

    /// Growth factor per attempt
    #[arg(long)]
    pub exponential_base: Option<f64>,

    /// Maximum random jitter added to each delay
    #[arg(long, value_parser = humantime::parse_duration)]
    pub jitter: Option<Duration>,
}

impl RetryArgs {
    /// Apply the flags over `config`'s retry section.
    pub fn apply(&self, config: &mut ResilienceConfig) {
        let retry = &mut config.retry;
        if let Some(max_retries) = self.max_retries {
            retry.max_retries = max_retries;
        }
        if let Some(base_delay) = self.base_delay {
            retry.base_delay = base_delay;
        }
        if let Some(max_delay) = self.max_delay {
            retry.max_delay = max_delay;
        }
        if let Some(exponential_base) = self.exponential_base {
            retry.exponential_base = exponential_base;
        }
        if let Some(jitter) = self.jitter {
            retry.jitter_max = jitter;
        }
    }
}

/// Load the config file (or defaults), apply retry flags and validate.
pub fn load_config(path: Option<&PathBuf>, overrides: &RetryArgs) -> Result<ResilienceConfig> {
    let mut config = match path {
        Some(path) => ResilienceConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ResilienceConfig::default(),
    };

    overrides.apply(&mut config);
    config.validate().context("Invalid retry flags")?;
    Ok(config)
}
