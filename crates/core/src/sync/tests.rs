//! End-to-end scenarios for the offline sync engine, driven through an
//! in-memory state store and a scripted transport double.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{Error, PersistenceError, RemoteError, Result};

use super::*;

/// Scripted transport double: records call order, fails configured ids.
#[derive(Default)]
struct ScriptedTransport {
    fail_moods: Mutex<HashSet<i64>>,
    fail_memories: Mutex<HashSet<i64>>,
    fail_requests: Mutex<HashSet<i64>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self::default()
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn fail_memory(&self, id: i64) {
        self.fail_memories.lock().unwrap().insert(id);
    }

    fn fail_request(&self, id: i64) {
        self.fail_requests.lock().unwrap().insert(id);
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, label: String, failed: bool) -> RemoteResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(label);
        if failed {
            return Err(RemoteError::api(503, "service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn push_mood(&self, entry: &MoodEntry) -> RemoteResult<()> {
        let failed = self.fail_moods.lock().unwrap().contains(&entry.id);
        self.record(format!("mood:{}", entry.id), failed).await
    }

    async fn push_memory(&self, entry: &MemoryEntry) -> RemoteResult<()> {
        let failed = self.fail_memories.lock().unwrap().contains(&entry.id);
        self.record(format!("memory:{}", entry.id), failed).await
    }

    async fn execute_request(&self, request: &QueuedRequest) -> RemoteResult<()> {
        let failed = self.fail_requests.lock().unwrap().contains(&request.id);
        self.record(format!("request:{}", request.id), failed).await
    }
}

/// Observer double collecting every completed pass report.
#[derive(Default)]
struct CountingObserver {
    reports: Mutex<Vec<SyncPassReport>>,
}

impl SyncObserver for CountingObserver {
    fn pass_completed(&self, report: &SyncPassReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

struct Harness {
    store: Arc<QueueStore>,
    recorder: MutationRecorder,
    transport: Arc<ScriptedTransport>,
    observer: Arc<CountingObserver>,
    controller: Arc<SyncController>,
}

fn harness(transport: ScriptedTransport) -> Harness {
    let store = Arc::new(QueueStore::new(Arc::new(MemoryStateStore::new())));
    let transport = Arc::new(transport);
    let observer = Arc::new(CountingObserver::default());
    let controller = Arc::new(SyncController::with_observer(
        store.clone(),
        transport.clone(),
        observer.clone(),
    ));
    Harness {
        recorder: MutationRecorder::new(store.clone()),
        store,
        transport,
        observer,
        controller,
    }
}

fn mood(label: &str) -> NewMoodEntry {
    NewMoodEntry {
        mood: label.to_string(),
        intensity: 5,
        notes: None,
    }
}

fn memory(title: &str) -> NewMemoryEntry {
    NewMemoryEntry {
        title: title.to_string(),
        content: "remembered for later".to_string(),
    }
}

fn checkin_request() -> NewQueuedRequest {
    NewQueuedRequest {
        method: "POST".to_string(),
        endpoint: "/api/v1/checkins".to_string(),
        payload: serde_json::json!({"kind": "evening"}),
    }
}

async fn completed(controller: &SyncController, trigger: SyncTrigger) -> SyncPassReport {
    match controller.trigger(trigger).await.expect("pass runs") {
        TriggerOutcome::Completed(report) => report,
        TriggerOutcome::AlreadyRunning => panic!("expected a completed pass"),
    }
}

#[tokio::test]
async fn clean_pass_drains_queue_to_empty() {
    let h = harness(ScriptedTransport::new());
    h.recorder.record_mood(mood("calm")).expect("mood");
    h.recorder.record_memory(memory("walk")).expect("memory");
    h.recorder.queue_request(checkin_request()).expect("request");
    assert_eq!(h.store.unsynced_count().expect("count"), 3);

    let report = completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(report.success_count, 3);
    assert_eq!(report.failure_count, 0);
    assert_eq!(report.total_count, 3);

    assert_eq!(h.store.unsynced_count().expect("count"), 0);
    assert_eq!(h.controller.phase(), SyncPhase::Idle);

    let state = h.store.get_state().expect("state");
    assert!(state.moods[0].synced, "moods stay for audit, marked synced");
    assert!(state.queued_requests.is_empty(), "requests are removed");
    assert!(state.last_sync_time > 0);
}

#[tokio::test]
async fn collections_drain_sequentially_in_insertion_order() {
    let h = harness(ScriptedTransport::new());
    let request = h.recorder.queue_request(checkin_request()).expect("request");
    let first_mood = h.recorder.record_mood(mood("calm")).expect("mood");
    let entry = h.recorder.record_memory(memory("walk")).expect("memory");
    let second_mood = h.recorder.record_mood(mood("tired")).expect("mood");

    completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(
        h.transport.calls(),
        vec![
            format!("mood:{}", first_mood.id),
            format!("mood:{}", second_mood.id),
            format!("memory:{}", entry.id),
            format!("request:{}", request.id),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_a_offline_mood_syncs_after_reconnect() {
    let h = harness(ScriptedTransport::new());
    let monitor = ConnectivityMonitor::with_debounce(
        h.controller.clone(),
        false,
        Duration::from_millis(CONNECTIVITY_DEBOUNCE_MS),
    );

    let entry = h.recorder.record_mood(mood("anxious")).expect("mood");
    assert_eq!(h.store.unsynced_count().expect("count"), 1);
    assert!(!monitor.is_online());

    monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(CONNECTIVITY_DEBOUNCE_MS + 100)).await;

    assert_eq!(h.store.unsynced_count().expect("count"), 0);
    let state = h.store.get_state().expect("state");
    assert!(state.moods.iter().any(|m| m.id == entry.id && m.synced));
    assert_eq!(h.observer.reports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn scenario_b_request_dropped_after_third_failed_pass() {
    let h = harness(ScriptedTransport::new());
    let request = h.recorder.queue_request(checkin_request()).expect("request");
    h.transport.fail_request(request.id);

    let first = completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(first.failure_count, 1);
    let state = h.store.get_state().expect("state");
    assert_eq!(state.queued_requests[0].retry_count, 1);

    let second = completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(second.failure_count, 1);
    let state = h.store.get_state().expect("state");
    assert_eq!(state.queued_requests[0].retry_count, 2);

    let third = completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(third.failure_count, 1);
    assert_eq!(third.total_count, 1);
    let state = h.store.get_state().expect("state");
    assert!(
        state.queued_requests.is_empty(),
        "request removed once retry count would reach the bound"
    );

    let fourth = completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(fourth.total_count, 0);
}

#[tokio::test]
async fn scenario_c_memory_failure_does_not_block_moods() {
    let h = harness(ScriptedTransport::new());
    h.recorder.record_mood(mood("calm")).expect("mood");
    h.recorder.record_mood(mood("hopeful")).expect("mood");
    let entry = h.recorder.record_memory(memory("walk")).expect("memory");
    h.transport.fail_memory(entry.id);

    let report = completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 1);
    assert_eq!(h.store.unsynced_count().expect("count"), 1);
    assert_eq!(h.controller.phase(), SyncPhase::IdleWithError);

    let status = h.controller.status().expect("status");
    assert_eq!(status.pending_count, 1);
    assert!(status.last_error.is_some());

    // The memory carries no retry counter; the next clean pass drains it.
    h.transport.fail_memories.lock().unwrap().clear();
    let report = completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(report.success_count, 1);
    assert_eq!(h.store.unsynced_count().expect("count"), 0);
    assert_eq!(h.controller.phase(), SyncPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_run_exactly_one_pass() {
    let h = harness(ScriptedTransport::with_delay(Duration::from_secs(1)));
    h.recorder.record_mood(mood("calm")).expect("mood");

    let controller = h.controller.clone();
    let first = tokio::spawn(async move { controller.trigger(SyncTrigger::Manual).await });
    tokio::task::yield_now().await;
    assert_eq!(h.controller.phase(), SyncPhase::Syncing);

    let second = h.controller.trigger(SyncTrigger::Manual).await.expect("second trigger");
    assert_eq!(second, TriggerOutcome::AlreadyRunning);

    let first = first.await.expect("join").expect("first trigger");
    assert!(matches!(first, TriggerOutcome::Completed(_)));
    assert_eq!(h.transport.call_count(), 1, "one remote call, one pass");
    assert_eq!(h.observer.reports.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_flaps_collapse_into_one_debounced_pass() {
    let h = harness(ScriptedTransport::new());
    let monitor = ConnectivityMonitor::new(h.controller.clone(), false);
    h.recorder.record_mood(mood("calm")).expect("mood");

    monitor.set_online(true);
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(200)).await;
    monitor.set_online(false);
    monitor.set_online(true);
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(499)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.transport.call_count(), 0, "debounce window still open");

    tokio::time::advance(Duration::from_millis(2)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.transport.call_count(), 1);
    assert_eq!(
        h.observer.reports.lock().unwrap().len(),
        1,
        "flap burst produces exactly one automatic pass"
    );
    assert_eq!(h.store.unsynced_count().expect("count"), 0);
}

#[tokio::test(start_paused = true)]
async fn going_offline_cancels_pending_trigger_but_not_inflight_pass() {
    let h = harness(ScriptedTransport::new());
    let monitor = ConnectivityMonitor::new(h.controller.clone(), false);
    h.recorder.record_mood(mood("calm")).expect("mood");

    // Offline within the debounce window: the scheduled trigger dies.
    monitor.set_online(true);
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(300)).await;
    monitor.set_online(false);
    tokio::time::advance(Duration::from_secs(5)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.transport.call_count(), 0);

    // Offline mid-pass: the debounced automatic pass runs to completion
    // regardless.
    let slow = harness(ScriptedTransport::with_delay(Duration::from_secs(1)));
    let slow_monitor = ConnectivityMonitor::new(slow.controller.clone(), false);
    slow.recorder.record_mood(mood("tired")).expect("mood");

    slow_monitor.set_online(true);
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(CONNECTIVITY_DEBOUNCE_MS + 1)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        slow.controller.phase(),
        SyncPhase::Syncing,
        "debounce fired into a slow pass"
    );

    slow_monitor.set_online(false);
    tokio::time::advance(Duration::from_secs(2)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(slow.controller.phase(), SyncPhase::Idle);
    assert_eq!(slow.transport.call_count(), 1);
    assert_eq!(slow.observer.reports.lock().unwrap().len(), 1);
    assert_eq!(slow.store.unsynced_count().expect("count"), 0);
}

#[tokio::test(start_paused = true)]
async fn entries_appended_mid_pass_are_deferred_to_the_next_pass() {
    let h = harness(ScriptedTransport::with_delay(Duration::from_secs(1)));
    let before = h.recorder.record_mood(mood("calm")).expect("mood");

    let controller = h.controller.clone();
    let pass = tokio::spawn(async move { controller.trigger(SyncTrigger::Manual).await });
    tokio::task::yield_now().await;

    let during = h.recorder.record_mood(mood("late")).expect("mood mid-pass");
    pass.await.expect("join").expect("pass");

    let state = h.store.get_state().expect("state");
    assert!(state.moods.iter().any(|m| m.id == before.id && m.synced));
    assert!(
        state
            .moods
            .iter()
            .any(|m| m.id == during.id && !m.synced),
        "mid-pass append waits for the next pass"
    );

    completed(&h.controller, SyncTrigger::Manual).await;
    assert_eq!(h.store.unsynced_count().expect("count"), 0);
}

/// State store whose reads fail, for pass-level error propagation.
struct UnreadableStore;

impl StateStore for UnreadableStore {
    fn load(&self, _key: &str) -> Result<Option<String>> {
        Err(PersistenceError::Read("backing store unavailable".to_string()).into())
    }

    fn save(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn unreadable_store_propagates_as_pass_level_failure() {
    let store = Arc::new(QueueStore::new(Arc::new(UnreadableStore)));
    let transport = Arc::new(ScriptedTransport::new());
    let controller = SyncController::new(store, transport);

    let err = controller
        .trigger(SyncTrigger::Manual)
        .await
        .expect_err("store read failure aborts the pass");
    assert!(matches!(err, Error::Persistence(PersistenceError::Read(_))));
    assert_eq!(controller.phase(), SyncPhase::IdleWithError);
}
