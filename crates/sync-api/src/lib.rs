//! HTTP client for the Mindhaven sync API.
//!
//! Implements the core `SyncTransport` port: one REST call per queued item,
//! any 2xx is success, everything else is failure.

mod client;
mod error;
mod types;

pub use client::SyncApiClient;
pub use error::{Result, SyncApiError};
pub use types::{ApiErrorResponse, MemoryEntryPayload, MoodEntryPayload};
