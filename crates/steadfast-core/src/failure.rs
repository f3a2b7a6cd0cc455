//! Failure classification for retry decisions.
//!
//! Retryability is decided from typed fields: a transient flag and an
//! optional HTTP status. Transport adapters populate those fields when they
//! build a failure, so the retry predicate never parses message text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// HTTP statuses that indicate a transient server-side condition.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

lazy_static! {
    /// Phrases and network error codes that mark a failure message as transient.
    static ref TRANSIENT_MESSAGE: Regex = Regex::new(
        r"(?i)connection timeout|connection refused|temporary failure|rate limit exceeded|\b(ETIMEDOUT|ECONNRESET|ECONNREFUSED|EPIPE|ENOTFOUND|EAI_AGAIN)\b"
    )
    .expect("transient message pattern is valid");
}

/// Exposes the fields the default retry predicate inspects.
pub trait Classify {
    /// Whether the failure is a recognised transient network condition.
    fn is_transient(&self) -> bool {
        false
    }

    /// HTTP-style status code carried by the failure, if any.
    fn http_status(&self) -> Option<u16> {
        None
    }
}

/// Default retry predicate.
///
/// A failure is retryable when it is transient or carries one of
/// [`RETRYABLE_STATUSES`]. Everything else propagates on first occurrence.
pub fn is_retryable<E: Classify + ?Sized>(failure: &E) -> bool {
    failure.is_transient()
        || failure
            .http_status()
            .is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
}

/// Whether a free-text failure message names a known transient condition.
///
/// Case-insensitive substring match; used by adapters at construction time.
pub fn message_is_transient(message: &str) -> bool {
    TRANSIENT_MESSAGE.is_match(message)
}

/// A failure produced by a wrapped operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct OperationFailure {
    /// Transient network condition (timeouts, resets, DNS hiccups)
    pub transient: bool,

    /// HTTP status returned by the dependency, if any
    pub http_status: Option<u16>,

    /// Human-readable description
    pub message: String,
}

impl OperationFailure {
    /// Failure with an explicit transient flag.
    pub fn new(message: impl Into<String>, transient: bool) -> Self {
        Self {
            transient,
            http_status: None,
            message: message.into(),
        }
    }

    /// Failure from a message, classifying known transient phrases.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            transient: message_is_transient(&message),
            http_status: None,
            message,
        }
    }

    /// Failure from an HTTP response status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            transient: false,
            http_status: Some(status),
            message: message.into(),
        }
    }

    /// Transient network failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(message, true)
    }

    /// Failure that must not be retried.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(message, false)
    }
}

impl Classify for OperationFailure {
    fn is_transient(&self) -> bool {
        self.transient
    }

    fn http_status(&self) -> Option<u16> {
        self.http_status
    }
}

impl Classify for io::Error {
    fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::TimedOut
                | io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::Interrupted
                | io::ErrorKind::WouldBlock
        )
    }
}

impl<E: Classify + ?Sized> Classify for Box<E> {
    fn is_transient(&self) -> bool {
        (**self).is_transient()
    }

    fn http_status(&self) -> Option<u16> {
        (**self).http_status()
    }
}
