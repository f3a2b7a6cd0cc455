//! Running a child process as a protected operation.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;

use steadfast_runtime::{Classify, Resilience};

/// Why one run of the child process failed.
#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Exit {
        program: String,
        status: ExitStatus,
        transient: bool,
    },
}

impl CommandFailure {
    /// Exit code to report for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            // Matches the shell's "command not found"
            CommandFailure::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => 127,
            CommandFailure::Spawn { .. } => 126,
            CommandFailure::Exit { status, .. } => status
                .code()
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .unwrap_or(1),
        }
    }
}

impl Classify for CommandFailure {
    fn is_transient(&self) -> bool {
        match self {
            CommandFailure::Spawn { source, .. } => source.is_transient(),
            CommandFailure::Exit { transient, .. } => *transient,
        }
    }
}

/// Whether a non-zero exit `code` should be retried.
///
/// With an empty list every failing exit is transient. A process killed by a
/// signal has no code and is only transient in that case.
pub fn exit_is_transient(code: Option<i32>, retry_on: &[i32]) -> bool {
    match code {
        Some(code) => retry_on.is_empty() || retry_on.contains(&code),
        None => retry_on.is_empty(),
    }
}

/// Run `program` with `args` once, inheriting stdio.
pub async fn run_command(program: &str, args: &[String], retry_on: &[i32]) -> Result<(), CommandFailure> {
    tracing::debug!(program, ?args, "Spawning command");

    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|source| CommandFailure::Spawn {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        return Ok(());
    }

    Err(CommandFailure::Exit {
        program: program.to_string(),
        status,
        transient: exit_is_transient(status.code(), retry_on),
    })
}

/// Run `program` under `resilience`'s retry policy until it succeeds, fails
/// permanently or runs out of attempts.
///
/// Each process invocation starts from an empty registry, so no circuit is
/// involved here: the last failure is returned as is.
pub async fn run_with_retry(
    resilience: &Resilience,
    program: &str,
    args: &[String],
    retry_on: &[i32],
) -> Result<(), CommandFailure> {
    resilience
        .with_retry(|| run_command(program, args, retry_on), None)
        .await
}
