//! Wire payloads for the Mindhaven sync API.

use serde::{Deserialize, Serialize};

use mindhaven_core::sync::{MemoryEntry, MoodEntry};

/// Body for `POST /api/v1/mood-entries`.
///
/// Carries the client-side id and creation timestamp so the service can
/// overwrite idempotently when a pass repeats a delivery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntryPayload {
    pub client_id: i64,
    pub mood: String,
    pub intensity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: String,
}

impl From<&MoodEntry> for MoodEntryPayload {
    fn from(entry: &MoodEntry) -> Self {
        Self {
            client_id: entry.id,
            mood: entry.mood.clone(),
            intensity: entry.intensity,
            notes: entry.notes.clone(),
            recorded_at: entry.created_at.clone(),
        }
    }
}

/// Body for `POST /api/v1/memories`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntryPayload {
    pub client_id: i64,
    pub title: String,
    pub content: String,
    pub recorded_at: String,
}

impl From<&MemoryEntry> for MemoryEntryPayload {
    fn from(entry: &MemoryEntry) -> Self {
        Self {
            client_id: entry.id,
            title: entry.title.clone(),
            content: entry.content.clone(),
            recorded_at: entry.created_at.clone(),
        }
    }
}

/// Error body returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}
