//! Core domain logic for the Mindhaven offline sync engine.
//!
//! The engine keeps a durable local queue of pending mutations (mood logs,
//! memory entries, generic queued API calls) and drains it against the remote
//! service whenever connectivity allows. See [`sync`] for the moving parts:
//! the [`sync::QueueStore`], the [`sync::MutationRecorder`], the
//! [`sync::ConnectivityMonitor`] and the [`sync::SyncController`].

pub mod errors;
pub mod sync;

pub use errors::{Error, Result};
