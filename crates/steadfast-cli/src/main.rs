//! steadfast CLI
//!
//! Runs a command under retry with backoff and exposes the config and
//! backoff schedule for inspection.
//!
//! ```text
//! steadfast exec --max-retries 5 --retry-on 75 -- ./sync.sh
//! steadfast config --config steadfast.yaml
//! steadfast backoff --base-delay 200ms --max-delay 5s
//! ```

mod cli;
mod exec;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steadfast_core::backoff_schedule;
use steadfast_runtime::Resilience;

use crate::cli::{load_config, Cli, Commands, ExecArgs, RetryArgs};
use crate::exec::run_with_retry;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Exec(args) => exec(cli.config.as_ref(), args).await,
        Commands::Config(overrides) => {
            let config = load_config(cli.config.as_ref(), &overrides)?;
            print!("{}", config.to_yaml()?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Backoff(overrides) => {
            print_schedule(cli.config.as_ref(), &overrides)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Filter used when `RUST_LOG` is unset. The `steadfast` target prefix
/// covers the binary and every `steadfast_*` library crate.
fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("steadfast={level}")
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn exec(config_path: Option<&std::path::PathBuf>, args: ExecArgs) -> Result<ExitCode> {
    let config = load_config(config_path, &args.retry)?;
    let resilience = Resilience::new(config);

    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("No command given"))?;

    tracing::info!(
        program = %program,
        max_retries = resilience.config().retry.max_retries,
        "Running command"
    );

    match run_with_retry(&resilience, program, rest, &args.retry_on).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(failure) => {
            tracing::error!(error = %failure, "Command failed");
            Ok(ExitCode::from(failure.exit_code()))
        }
    }
}

fn print_schedule(config_path: Option<&std::path::PathBuf>, overrides: &RetryArgs) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let schedule = backoff_schedule(&config.retry);

    if schedule.is_empty() {
        println!("no retries configured");
        return Ok(());
    }

    let mut total = std::time::Duration::ZERO;
    for (attempt, delay) in schedule.iter().enumerate() {
        total += *delay;
        println!(
            "retry {:>2}  after {:<10} (cumulative {})",
            attempt + 1,
            humantime::format_duration(*delay).to_string(),
            humantime::format_duration(total)
        );
    }
    println!(
        "jitter adds up to {} per retry",
        humantime::format_duration(config.retry.jitter_max)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "steadfast=info");
        assert_eq!(default_filter(true), "steadfast=debug");
        assert!(default_filter(false)
            .parse::<tracing_subscriber::EnvFilter>()
            .is_ok());
    }
}
