//! Connectivity monitor: consumes the platform online/offline signal and
//! schedules the debounced automatic sync trigger.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;

use super::controller::SyncController;
use super::queue_model::SyncTrigger;
use super::scheduler::CONNECTIVITY_DEBOUNCE_MS;

/// Tracks online/offline transitions and fires the controller's automatic
/// trigger once per transition to online, after a debounce window that
/// collapses flap bursts into a single pass.
///
/// The platform signal is trusted as-is. There is no reachability probing, so
/// an "online" report can be a false positive (captive portals); the pass
/// itself then fails item by item and waits for the next transition.
pub struct ConnectivityMonitor {
    controller: Arc<SyncController>,
    online: watch::Sender<bool>,
    /// Bumped on every transition. A scheduled trigger only fires if it still
    /// carries the latest value, so flaps supersede the pending trigger
    /// without ever touching a pass that has already started.
    generation: Arc<AtomicU64>,
    debounce_window: Duration,
}

impl ConnectivityMonitor {
    pub fn new(controller: Arc<SyncController>, initially_online: bool) -> Self {
        Self::with_debounce(
            controller,
            initially_online,
            Duration::from_millis(CONNECTIVITY_DEBOUNCE_MS),
        )
    }

    pub fn with_debounce(
        controller: Arc<SyncController>,
        initially_online: bool,
        debounce_window: Duration,
    ) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self {
            controller,
            online,
            generation: Arc::new(AtomicU64::new(0)),
            debounce_window,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Subscription used for UI pending-count display and by tests.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Platform callback entry point. Must run inside the tokio runtime;
    /// duplicate reports are ignored.
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if !changed {
            return;
        }

        // Every transition supersedes a scheduled trigger that has not fired
        // yet; an in-flight pass is left alone.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if online {
            info!(
                "Connectivity restored, scheduling sync pass in {} ms",
                self.debounce_window.as_millis()
            );
            let controller = self.controller.clone();
            let latest = self.generation.clone();
            let window = self.debounce_window;
            tokio::spawn(async move {
                tokio::time::sleep(window).await;
                if latest.load(Ordering::SeqCst) != generation {
                    debug!("Scheduled sync pass superseded by a newer connectivity transition");
                    return;
                }
                if let Err(err) = controller.trigger(SyncTrigger::Connectivity).await {
                    warn!("Automatic sync pass failed: {}", err);
                }
            });
        } else {
            debug!("Connectivity lost");
        }
    }
}
