//! Error types for the sync API crate.

use thiserror::Error;

use mindhaven_core::errors::RemoteError;
use mindhaven_core::sync::{classify_http_status, RetryClass};

/// Result type alias for sync API operations.
pub type Result<T> = std::result::Result<T, SyncApiError>;

/// Errors that can occur while talking to the Mindhaven API.
#[derive(Debug, Error)]
pub enum SyncApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (bad method, malformed token, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SyncApiError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry logging.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => RetryClass::Retryable,
            Self::Json(_) => RetryClass::Permanent,
            Self::InvalidRequest(_) => RetryClass::Permanent,
        }
    }
}

impl From<SyncApiError> for RemoteError {
    fn from(error: SyncApiError) -> Self {
        match error {
            SyncApiError::Api { status, message } => RemoteError::Api { status, message },
            other => RemoteError::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_class_follows_status() {
        assert_eq!(
            SyncApiError::api(503, "unavailable").retry_class(),
            RetryClass::Retryable
        );
        assert_eq!(
            SyncApiError::api(400, "bad request").retry_class(),
            RetryClass::Permanent
        );
        assert_eq!(
            SyncApiError::invalid_request("bad method").retry_class(),
            RetryClass::Permanent
        );
    }

    #[test]
    fn api_errors_keep_their_status_through_core_conversion() {
        let remote = RemoteError::from(SyncApiError::api(429, "slow down"));
        assert_eq!(remote.status_code(), Some(429));

        let remote = RemoteError::from(SyncApiError::invalid_request("bad method"));
        assert_eq!(remote.status_code(), None);
    }
}
