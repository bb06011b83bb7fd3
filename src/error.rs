//! Error types for sticker-dl
//!
//! This module provides the error taxonomy for the pipeline:
//! - Transient transport failures (retried by [`crate::retry`])
//! - Rate-limit signals carrying a server-specified delay
//! - Terminal per-operation failures (`ExhaustedRetries`)
//! - Terminal per-job failures (workspace I/O, packaging, unsupported host)

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for sticker-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sticker-dl
///
/// Per-asset failures in the fetch and convert stages are absorbed into
/// result records and never surface as this type; everything that does
/// surface here is terminal for either one remote operation
/// ([`Error::ExhaustedRetries`]) or the whole job.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "part_size")
        key: Option<String>,
    },

    /// Transport-level failure (connection refused, reset, DNS, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote operation timed out
    #[error("timed out: {0}")]
    Timeout(String),

    /// Remote side asked us to back off for a server-specified delay
    #[error("rate limited: retry after {}s", retry_after.as_secs())]
    RateLimited {
        /// How long the remote side asked us to wait before the next attempt
        retry_after: Duration,
    },

    /// A retried operation failed on every attempt of its budget
    #[error("retries exhausted after {attempts} attempts: {source}")]
    ExhaustedRetries {
        /// Total number of attempts that were made
        attempts: u32,
        /// The error returned by the final attempt
        #[source]
        source: Box<Error>,
    },

    /// I/O error (workspace creation, disk writes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The job archive could not be finalized
    #[error("packaging failed for {archive}: {reason}")]
    Packaging {
        /// The archive file that could not be written
        archive: PathBuf,
        /// The reason packaging failed
        reason: String,
    },

    /// The external converter failed for one asset
    #[error("conversion failed for {unique_id}: {reason}")]
    Converter {
        /// Unique ID of the asset that failed to convert
        unique_id: String,
        /// Exit status or spawn error from the converter
        reason: String,
    },

    /// No conversion tooling exists for the host platform
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// No conversion tooling exists for the requested output format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The job's asset list is empty after eligibility filtering
    #[error("no eligible assets in job")]
    NoEligibleAssets,
}

impl Error {
    /// Returns true if the error is transient and the operation should be retried
    ///
    /// Transient failures (timeouts, connection glitches, rate limits) are
    /// expected to resolve by waiting and retrying. Everything else is
    /// permanent and propagates immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout(_) | Error::RateLimited { .. } => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// The server-specified delay before the next attempt, if this failure
    /// carries one (rate limits do, other transient failures do not)
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
