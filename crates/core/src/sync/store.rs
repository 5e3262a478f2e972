//! Durable queue store: one JSON document under a fixed key, behind an
//! injected key-value persistence port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use log::{debug, error};

use crate::errors::{PersistenceError, Result};

use super::queue_model::{
    MemoryEntry, MoodEntry, NewMemoryEntry, NewMoodEntry, NewQueuedRequest, QueueState,
    QueuedRequest,
};

/// Fixed storage key of the persisted queue document.
pub const STORAGE_KEY: &str = "mindhaven.offline-queue";

/// Platform key-value persistence port.
///
/// All queue mutation happens on a single logical thread, so implementations
/// need no transactional isolation across calls; they only have to make each
/// individual `save` atomic.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory [`StateStore`] used by tests and as a no-persistence fallback.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Read("state store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Write("state store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The durable store for pending offline mutations.
///
/// Every mutating call performs a full read-modify-write of the persisted
/// document. If the backend write fails, the previously persisted state is
/// unchanged and the attempted mutation is lost; the failure is logged and
/// returned, never repaired silently.
pub struct QueueStore {
    backend: Arc<dyn StateStore>,
}

impl QueueStore {
    pub fn new(backend: Arc<dyn StateStore>) -> Self {
        Self { backend }
    }

    /// Read a snapshot of the full queue state. A missing document is the
    /// empty state.
    pub fn get_state(&self) -> Result<QueueState> {
        match self.backend.load(STORAGE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| PersistenceError::Serialization(e.to_string()).into()),
            None => Ok(QueueState::default()),
        }
    }

    fn persist(&self, state: &QueueState) -> Result<()> {
        let raw = serde_json::to_string(state)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        if let Err(err) = self.backend.save(STORAGE_KEY, &raw) {
            error!(
                "Queue state write failed, keeping previously persisted state: {}",
                err
            );
            return Err(err);
        }
        Ok(())
    }

    /// Append a mood entry, assigning its id and creation timestamp.
    pub fn append_mood(&self, new_entry: NewMoodEntry) -> Result<MoodEntry> {
        let mut state = self.get_state()?;
        let entry = MoodEntry {
            id: allocate_id(state.moods.iter().map(|m| m.id)),
            mood: new_entry.mood,
            intensity: new_entry.intensity,
            notes: new_entry.notes,
            created_at: now_rfc3339(),
            synced: false,
        };
        state.moods.push(entry.clone());
        self.persist(&state)?;
        Ok(entry)
    }

    /// Append a memory entry, assigning its id and creation timestamp.
    pub fn append_memory(&self, new_entry: NewMemoryEntry) -> Result<MemoryEntry> {
        let mut state = self.get_state()?;
        let entry = MemoryEntry {
            id: allocate_id(state.memories.iter().map(|m| m.id)),
            title: new_entry.title,
            content: new_entry.content,
            created_at: now_rfc3339(),
            synced: false,
        };
        state.memories.push(entry.clone());
        self.persist(&state)?;
        Ok(entry)
    }

    /// Append a queued request with a fresh retry counter.
    pub fn append_request(&self, new_request: NewQueuedRequest) -> Result<QueuedRequest> {
        let mut state = self.get_state()?;
        let entry = QueuedRequest {
            id: allocate_id(state.queued_requests.iter().map(|r| r.id)),
            method: new_request.method,
            endpoint: new_request.endpoint,
            payload: new_request.payload,
            created_at: now_rfc3339(),
            retry_count: 0,
        };
        state.queued_requests.push(entry.clone());
        self.persist(&state)?;
        Ok(entry)
    }

    /// Mark a mood entry as confirmed by the remote service.
    ///
    /// Idempotent: an already-synced or unknown id is a no-op and performs no
    /// write.
    pub fn mark_mood_synced(&self, id: i64) -> Result<()> {
        let mut state = self.get_state()?;
        match state.moods.iter_mut().find(|m| m.id == id && !m.synced) {
            Some(entry) => entry.synced = true,
            None => {
                debug!("mark_mood_synced({}) matched no pending entry", id);
                return Ok(());
            }
        }
        self.persist(&state)
    }

    /// Mark a memory entry as confirmed by the remote service. Idempotent.
    pub fn mark_memory_synced(&self, id: i64) -> Result<()> {
        let mut state = self.get_state()?;
        match state.memories.iter_mut().find(|m| m.id == id && !m.synced) {
            Some(entry) => entry.synced = true,
            None => {
                debug!("mark_memory_synced({}) matched no pending entry", id);
                return Ok(());
            }
        }
        self.persist(&state)
    }

    /// Remove a queued request. Idempotent.
    pub fn remove_request(&self, id: i64) -> Result<()> {
        let mut state = self.get_state()?;
        let before = state.queued_requests.len();
        state.queued_requests.retain(|r| r.id != id);
        if state.queued_requests.len() == before {
            debug!("remove_request({}) matched no entry", id);
            return Ok(());
        }
        self.persist(&state)
    }

    /// Bump the retry counter of a queued request, returning the new count.
    pub fn increment_retry(&self, id: i64) -> Result<i32> {
        let mut state = self.get_state()?;
        let Some(entry) = state.queued_requests.iter_mut().find(|r| r.id == id) else {
            debug!("increment_retry({}) matched no entry", id);
            return Ok(0);
        };
        entry.retry_count += 1;
        let count = entry.retry_count;
        self.persist(&state)?;
        Ok(count)
    }

    /// Record when the last sync pass finished.
    pub fn set_last_sync_time(&self, epoch_ms: i64) -> Result<()> {
        let mut state = self.get_state()?;
        state.last_sync_time = epoch_ms;
        self.persist(&state)
    }

    /// Items still awaiting remote confirmation.
    pub fn unsynced_count(&self) -> Result<usize> {
        Ok(self.get_state()?.unsynced_count())
    }

    /// Drop synced mood/memory entries retained for audit, returning how many
    /// were removed. Invoked by the retention collaborator, never by the sync
    /// pass itself.
    pub fn clear_synced(&self) -> Result<usize> {
        let mut state = self.get_state()?;
        let before = state.moods.len() + state.memories.len();
        state.moods.retain(|m| !m.synced);
        state.memories.retain(|m| !m.synced);
        let dropped = before - (state.moods.len() + state.memories.len());
        if dropped == 0 {
            return Ok(0);
        }
        self.persist(&state)?;
        Ok(dropped)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Ids derive from the creation timestamp and stay strictly increasing within
/// a collection even when two appends land on the same millisecond.
fn allocate_id(existing: impl Iterator<Item = i64>) -> i64 {
    let now = Utc::now().timestamp_millis();
    match existing.max() {
        Some(last) => now.max(last + 1),
        None => now,
    }
}
