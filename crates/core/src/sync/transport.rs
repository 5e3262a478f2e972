//! Transport port for remote sync calls.

use async_trait::async_trait;

use crate::errors::RemoteError;

use super::queue_model::{MemoryEntry, MoodEntry, QueuedRequest};

/// Result type for remote calls issued during a pass.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Remote API port used by the sync controller.
///
/// One call per queued item; any 2xx response is success, everything else is
/// failure. Implementations own endpoint and payload shapes.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Write one mood entry to the remote service.
    async fn push_mood(&self, entry: &MoodEntry) -> RemoteResult<()>;

    /// Write one memory entry to the remote service.
    async fn push_memory(&self, entry: &MemoryEntry) -> RemoteResult<()>;

    /// Replay one queued request verbatim.
    async fn execute_request(&self, request: &QueuedRequest) -> RemoteResult<()>;
}
