//! Cadence constants for sync scheduling.

/// Debounce window (milliseconds) between an offline→online transition and
/// the automatic sync pass, absorbing connectivity flapping.
pub const CONNECTIVITY_DEBOUNCE_MS: u64 = 500;

/// Per-request timeout for remote sync calls. Bounds how long one stalled
/// request can hold up the rest of the pass.
pub const REMOTE_CALL_TIMEOUT_SECS: u64 = 10;
