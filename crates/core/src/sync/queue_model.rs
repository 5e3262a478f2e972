//! Offline queue domain models.

use serde::{Deserialize, Serialize};

use super::engine::MAX_RETRIES;

/// A mood log captured locally and awaiting remote confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: i64,
    pub mood: String,
    pub intensity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub synced: bool,
}

/// A memory entry captured locally and awaiting remote confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub synced: bool,
}

/// A generic API call queued for replay once connectivity returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub id: i64,
    pub method: String,
    pub endpoint: String,
    pub payload: serde_json::Value,
    pub created_at: String,
    pub retry_count: i32,
}

/// Full queue state, persisted as one JSON document under a fixed key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueState {
    pub moods: Vec<MoodEntry>,
    pub memories: Vec<MemoryEntry>,
    pub queued_requests: Vec<QueuedRequest>,
    pub last_sync_time: i64,
}

impl QueueState {
    /// Items still awaiting remote confirmation: unsynced moods and memories
    /// plus requests that have attempts left.
    pub fn unsynced_count(&self) -> usize {
        self.moods.iter().filter(|m| !m.synced).count()
            + self.memories.iter().filter(|m| !m.synced).count()
            + self
                .queued_requests
                .iter()
                .filter(|r| r.retry_count < MAX_RETRIES)
                .count()
    }
}

/// Caller-supplied fields for a new mood log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMoodEntry {
    pub mood: String,
    pub intensity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Caller-supplied fields for a new memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemoryEntry {
    pub title: String,
    pub content: String,
}

/// Caller-supplied fields for a new queued request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQueuedRequest {
    pub method: String,
    pub endpoint: String,
    pub payload: serde_json::Value,
}

/// Trigger source for sync passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Startup,
    Connectivity,
    Manual,
}

/// Controller lifecycle phase.
///
/// `IdleWithError` is an idle variant: the controller is ready for the next
/// trigger, and the last pass left failures behind for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Syncing,
    IdleWithError,
}
