//! Error types for talking to the DevPulse backend.

use thiserror::Error;

/// Failure of a single backend call.
///
/// Cloneable so one failure can be attached to a view state and observed by
/// several subscribers at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, reset, ...).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The server answered with a failure status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The subject is unknown to the backend.
    #[error("Not found: {body}")]
    NotFound { body: String },

    /// The stored credential was rejected. Already handled by the transport.
    #[error("Unauthorized: session expired or missing credentials")]
    Unauthorized,

    /// Rejected locally before any request was sent.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The session token could not be persisted.
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => true,
            ApiError::Http { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether this error means the subject does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}
