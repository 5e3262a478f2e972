//! Sync controller: drains the offline queue against the remote API.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::errors::Result;

use super::engine::{classify_remote_error, SyncPassReport, MAX_RETRIES};
use super::queue_model::{SyncPhase, SyncTrigger};
use super::store::QueueStore;
use super::transport::SyncTransport;

/// Observability sink for completed passes. The concrete analytics
/// collaborator lives outside the engine.
pub trait SyncObserver: Send + Sync {
    fn pass_completed(&self, report: &SyncPassReport);
}

/// Default observer: logs the pass outcome.
pub struct LogSyncObserver;

impl SyncObserver for LogSyncObserver {
    fn pass_completed(&self, report: &SyncPassReport) {
        log::info!(
            "Sync pass finished: {} of {} item(s) synced, {} failed ({} ms)",
            report.success_count,
            report.total_count,
            report.failure_count,
            report.duration_ms
        );
    }
}

/// Outcome of a trigger call.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// A pass ran to completion.
    Completed(SyncPassReport),
    /// A pass was already in flight; this trigger was a no-op.
    AlreadyRunning,
}

/// Lightweight controller status for UI display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncControllerStatus {
    pub phase: SyncPhase,
    pub pending_count: usize,
    pub last_sync_time: Option<i64>,
    pub last_error: Option<String>,
    pub last_pass: Option<SyncPassReport>,
}

/// The reconciler at the center of the engine.
///
/// Single-flight: a trigger while a pass is in flight is a no-op. Within a
/// pass, collections drain sequentially (moods, memories, requests) in
/// insertion order, one remote call at a time, continuing past per-item
/// failures. Items appended mid-pass are addressed by id and simply picked up
/// by the next pass.
pub struct SyncController {
    store: Arc<QueueStore>,
    transport: Arc<dyn SyncTransport>,
    observer: Arc<dyn SyncObserver>,
    pass_guard: tokio::sync::Mutex<()>,
    phase: watch::Sender<SyncPhase>,
    last_pass: Mutex<Option<SyncPassReport>>,
    last_error: Mutex<Option<String>>,
}

impl SyncController {
    pub fn new(store: Arc<QueueStore>, transport: Arc<dyn SyncTransport>) -> Self {
        Self::with_observer(store, transport, Arc::new(LogSyncObserver))
    }

    pub fn with_observer(
        store: Arc<QueueStore>,
        transport: Arc<dyn SyncTransport>,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            transport,
            observer,
            pass_guard: tokio::sync::Mutex::new(()),
            phase,
            last_pass: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase transitions.
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Status snapshot for UI display of pending count and last outcome.
    pub fn status(&self) -> Result<SyncControllerStatus> {
        let state = self.store.get_state()?;
        Ok(SyncControllerStatus {
            phase: *self.phase.borrow(),
            pending_count: state.unsynced_count(),
            last_sync_time: (state.last_sync_time > 0).then_some(state.last_sync_time),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            last_pass: self
                .last_pass
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        })
    }

    /// Run one pass now, or observe that one is already in flight.
    ///
    /// Per-item failures are swallowed into the report's failure count; only
    /// a pass-level failure (inability to read the store) propagates as `Err`.
    pub async fn trigger(&self, trigger: SyncTrigger) -> Result<TriggerOutcome> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            debug!("Sync pass already in flight, ignoring {:?} trigger", trigger);
            return Ok(TriggerOutcome::AlreadyRunning);
        };

        self.phase.send_replace(SyncPhase::Syncing);
        let started_at = Instant::now();
        match self.run_pass(trigger, started_at).await {
            Ok(report) => {
                let next_phase = if report.failure_count > 0 {
                    SyncPhase::IdleWithError
                } else {
                    SyncPhase::Idle
                };
                *self
                    .last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) =
                    (report.failure_count > 0).then(|| {
                        format!(
                            "{} of {} item(s) failed to sync",
                            report.failure_count, report.total_count
                        )
                    });
                *self
                    .last_pass
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
                self.phase.send_replace(next_phase);
                self.observer.pass_completed(&report);
                Ok(TriggerOutcome::Completed(report))
            }
            Err(err) => {
                warn!("Sync pass aborted: {}", err);
                *self
                    .last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
                self.phase.send_replace(SyncPhase::IdleWithError);
                Err(err)
            }
        }
    }

    async fn run_pass(&self, trigger: SyncTrigger, started_at: Instant) -> Result<SyncPassReport> {
        let snapshot = self.store.get_state()?;
        let moods: Vec<_> = snapshot.moods.into_iter().filter(|m| !m.synced).collect();
        let memories: Vec<_> = snapshot.memories.into_iter().filter(|m| !m.synced).collect();
        let requests: Vec<_> = snapshot
            .queued_requests
            .into_iter()
            .filter(|r| r.retry_count < MAX_RETRIES)
            .collect();
        let total_count = moods.len() + memories.len() + requests.len();
        debug!(
            "Starting {:?} sync pass: {} mood(s), {} memory entrie(s), {} request(s)",
            trigger,
            moods.len(),
            memories.len(),
            requests.len()
        );

        let mut success_count = 0usize;
        let mut failure_count = 0usize;

        for entry in &moods {
            match self.transport.push_mood(entry).await {
                Ok(()) => match self.store.mark_mood_synced(entry.id) {
                    Ok(()) => success_count += 1,
                    Err(err) => {
                        warn!(
                            "Mood {} synced remotely but could not be marked locally: {}",
                            entry.id, err
                        );
                        failure_count += 1;
                    }
                },
                Err(err) => {
                    warn!(
                        "Mood {} push failed ({:?}): {}",
                        entry.id,
                        classify_remote_error(&err),
                        err
                    );
                    failure_count += 1;
                }
            }
        }

        for entry in &memories {
            match self.transport.push_memory(entry).await {
                Ok(()) => match self.store.mark_memory_synced(entry.id) {
                    Ok(()) => success_count += 1,
                    Err(err) => {
                        warn!(
                            "Memory {} synced remotely but could not be marked locally: {}",
                            entry.id, err
                        );
                        failure_count += 1;
                    }
                },
                Err(err) => {
                    warn!(
                        "Memory {} push failed ({:?}): {}",
                        entry.id,
                        classify_remote_error(&err),
                        err
                    );
                    failure_count += 1;
                }
            }
        }

        for request in &requests {
            match self.transport.execute_request(request).await {
                Ok(()) => match self.store.remove_request(request.id) {
                    Ok(()) => success_count += 1,
                    Err(err) => {
                        warn!(
                            "Request {} completed remotely but could not be removed locally: {}",
                            request.id, err
                        );
                        failure_count += 1;
                    }
                },
                Err(err) => {
                    failure_count += 1;
                    let class = classify_remote_error(&err);
                    if request.retry_count + 1 < MAX_RETRIES {
                        warn!(
                            "Request {} {} failed ({:?}), attempt {} of {}: {}",
                            request.method,
                            request.endpoint,
                            class,
                            request.retry_count + 1,
                            MAX_RETRIES,
                            err
                        );
                        if let Err(store_err) = self.store.increment_retry(request.id) {
                            warn!(
                                "Failed to record retry for request {}: {}",
                                request.id, store_err
                            );
                        }
                    } else {
                        warn!(
                            "Request {} {} failed ({:?}) on its final attempt, dropping: {}",
                            request.method, request.endpoint, class, err
                        );
                        if let Err(store_err) = self.store.remove_request(request.id) {
                            warn!("Failed to drop request {}: {}", request.id, store_err);
                        }
                    }
                }
            }
        }

        if let Err(err) = self.store.set_last_sync_time(Utc::now().timestamp_millis()) {
            warn!("Failed to record last sync time: {}", err);
        }

        Ok(SyncPassReport {
            trigger,
            success_count,
            failure_count,
            total_count,
            duration_ms: started_at.elapsed().as_millis() as i64,
            finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}
