//! Error types shared across the Mindhaven crates.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Local state store failures.
///
/// When a write fails the previously persisted state is left unchanged and
/// the attempted mutation is lost; callers observe the error, nothing is
/// silently repaired.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading the persisted document failed
    #[error("State read failed: {0}")]
    Read(String),

    /// Writing the persisted document failed (quota, I/O)
    #[error("State write failed: {0}")]
    Write(String),

    /// The persisted document could not be (de)serialized
    #[error("State serialization failed: {0}")]
    Serialization(String),
}

/// Remote API failures. Any non-2xx response is a failure.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Error response from the sync service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level failure (connect, timeout, body)
    #[error("Network error: {0}")]
    Network(String),
}

impl RemoteError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// HTTP status if the remote service answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(_) => None,
        }
    }
}

/// Errors that can occur in the offline sync engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Local store read/write failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Remote call failed
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Caller-supplied data was rejected before it reached the store
    #[error("Invalid input: {0}")]
    Validation(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
