//! Mutation recorder: the entry point application logic uses to queue work.

use std::sync::Arc;

use log::debug;

use crate::errors::{Error, Result};

use super::queue_model::{
    MemoryEntry, MoodEntry, NewMemoryEntry, NewMoodEntry, NewQueuedRequest, QueuedRequest,
};
use super::store::QueueStore;

const SUPPORTED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Appends a pending mutation when an application action occurs — typically,
/// but not only, while offline. Validation failures never touch the store.
pub struct MutationRecorder {
    store: Arc<QueueStore>,
}

impl MutationRecorder {
    pub fn new(store: Arc<QueueStore>) -> Self {
        Self { store }
    }

    /// Record a mood log for later sync.
    pub fn record_mood(&self, new_entry: NewMoodEntry) -> Result<MoodEntry> {
        if new_entry.mood.trim().is_empty() {
            return Err(Error::validation("Mood label must not be empty"));
        }
        if !(1..=10).contains(&new_entry.intensity) {
            return Err(Error::validation(format!(
                "Mood intensity {} is outside 1..=10",
                new_entry.intensity
            )));
        }
        let entry = self.store.append_mood(new_entry)?;
        debug!("Recorded mood {} for later sync", entry.id);
        Ok(entry)
    }

    /// Record a memory entry for later sync.
    pub fn record_memory(&self, new_entry: NewMemoryEntry) -> Result<MemoryEntry> {
        if new_entry.title.trim().is_empty() {
            return Err(Error::validation("Memory title must not be empty"));
        }
        let entry = self.store.append_memory(new_entry)?;
        debug!("Recorded memory {} for later sync", entry.id);
        Ok(entry)
    }

    /// Queue a generic API call for replay. The method is normalized to
    /// uppercase; the endpoint must be an absolute path.
    pub fn queue_request(&self, new_request: NewQueuedRequest) -> Result<QueuedRequest> {
        let method = new_request.method.trim().to_ascii_uppercase();
        if !SUPPORTED_METHODS.contains(&method.as_str()) {
            return Err(Error::validation(format!(
                "Unsupported request method '{}'",
                new_request.method
            )));
        }
        if !new_request.endpoint.starts_with('/') {
            return Err(Error::validation(format!(
                "Endpoint '{}' must be an absolute path",
                new_request.endpoint
            )));
        }
        let entry = self.store.append_request(NewQueuedRequest {
            method,
            ..new_request
        })?;
        debug!(
            "Queued {} {} for later sync",
            entry.method, entry.endpoint
        );
        Ok(entry)
    }
}
