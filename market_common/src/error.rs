//! Error types shared between the dashboard server and client.
//!
//! The `MarketError` enum unifies common failure cases for I/O, serialization,
//! HTTP calls to the data providers, request validation and background workers,
//! allowing crates to propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by server and client.
#[derive(Error, Debug)]
pub enum MarketError {
    /// I/O error originating from the standard library or sockets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a status we do not handle.
    #[error("Unexpected HTTP status {status} from {url}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The provider refused the request because of its rate limit (HTTP 429).
    #[error("Rate limited by {0}")]
    RateLimited(String),

    /// The provider answered, but the payload did not have the expected shape.
    #[error("Unexpected response format: {0}")]
    ResponseFormat(String),

    /// A URL could not be built from the configured base address.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A symbol failed validation.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// A request parameter failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A background task running a blocking call panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl MarketError {
    /// `true` for errors caused by the caller's input rather than by a provider.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MarketError::InvalidSymbol(_) | MarketError::InvalidRequest(_)
        )
    }
}

impl<T> From<PoisonError<T>> for MarketError {
    fn from(err: PoisonError<T>) -> Self {
        MarketError::MutexLock(err.to_string())
    }
}

