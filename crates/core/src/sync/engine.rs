//! Retry policy helpers and pass metrics for the sync engine.

use serde::{Deserialize, Serialize};

use crate::errors::RemoteError;

use super::queue_model::SyncTrigger;

/// Upper bound on failed attempts for a generic queued request before it is
/// discarded as a permanent failure.
pub const MAX_RETRIES: i32 = 3;

/// Retry policy classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryClass {
    Retryable,
    Permanent,
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> RetryClass {
    match status {
        408 | 429 => RetryClass::Retryable,
        500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

/// Classify a remote call failure. Network-level failures are retryable.
///
/// The drain path treats both classes identically; the class is recorded in
/// logs so the analytics collaborator can tell 4xx rejections apart from
/// connectivity noise.
pub fn classify_remote_error(error: &RemoteError) -> RetryClass {
    match error {
        RemoteError::Api { status, .. } => classify_http_status(*status),
        RemoteError::Network(_) => RetryClass::Retryable,
    }
}

/// Metrics emitted at the end of every sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPassReport {
    pub trigger: SyncTrigger,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_count: usize,
    pub duration_ms: i64,
    pub finished_at: String,
}
