//! JSON envelope returned by every `/api` route.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uniform API response: either `data` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// `true` when `data` is set.
    pub success: bool,
    /// Payload of a successful call.
    pub data: Option<T>,
    /// Message of a failed call.
    pub error: Option<String>,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed response carrying a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}
