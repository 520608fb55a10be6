//! C17 — the hourly background tick that drives `LifecycleManager`,
//! grounded on `original_source/src/memory/lifecycle_scheduler.py`: every
//! tick runs demotion, every sixth tick also runs archival, and the
//! hour-0 tick additionally runs `make_rehydratable` and event-log
//! cleanup. A tick that errors logs and continues — the loop never dies.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use super::{LifecycleManager, DEFAULT_ARCHIVE_THRESHOLD_DAYS, DEFAULT_DEMOTE_THRESHOLD_DAYS, DEFAULT_EVENT_RETENTION_DAYS, DEFAULT_REHYDRATE_THRESHOLD_DAYS};

const TICK_INTERVAL: Duration = Duration::from_secs(3600);
const ARCHIVE_EVERY_N_TICKS: u64 = 6;

pub struct LifecycleScheduler {
    manager: Arc<LifecycleManager>,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl LifecycleScheduler {
    pub fn new(manager: Arc<LifecycleManager>) -> Self {
        Self { manager, tick_interval: TICK_INTERVAL, running: Arc::new(AtomicBool::new(false)), stop: Arc::new(Notify::new()), handle: None }
    }

    #[cfg(test)]
    pub fn with_interval(manager: Arc<LifecycleManager>, tick_interval: Duration) -> Self {
        Self { manager, tick_interval, running: Arc::new(AtomicBool::new(false)), stop: Arc::new(Notify::new()), handle: None }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the tick loop if it isn't already running. Idempotent.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let manager = self.manager.clone();
        let interval = self.tick_interval;
        let running = self.running.clone();
        let stop = self.stop.clone();

        self.handle = Some(tokio::spawn(async move {
            let hour = AtomicU64::new(0);
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = stop.notified() => break,
                }
                let current_hour = hour.fetch_add(1, Ordering::SeqCst);
                run_tick(&manager, current_hour);
            }
            running.store(false, Ordering::SeqCst);
        }));
    }

    /// Signals the loop to stop and waits for it to finish. Idempotent.
    pub async fn stop(&mut self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        self.stop.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// One scheduler tick's work, factored out so tests can drive it directly
/// without waiting on real wall-clock sleeps.
fn run_tick(manager: &LifecycleManager, current_hour: u64) {
    if let Err(e) = manager.demote_stale_chunks(DEFAULT_DEMOTE_THRESHOLD_DAYS) {
        tracing::warn!(error = %e, "lifecycle tick: demotion failed");
    }

    if current_hour % ARCHIVE_EVERY_N_TICKS == 0 {
        if let Err(e) = manager.archive_demoted_chunks(DEFAULT_ARCHIVE_THRESHOLD_DAYS) {
            tracing::warn!(error = %e, "lifecycle tick: archival failed");
        }
    }

    if current_hour % 24 == 0 {
        if let Err(e) = manager.make_rehydratable(DEFAULT_REHYDRATE_THRESHOLD_DAYS) {
            tracing::warn!(error = %e, "lifecycle tick: make_rehydratable failed");
        }
        if let Err(e) = manager.storage.cleanup_old_events(DEFAULT_EVENT_RETENTION_DAYS) {
            tracing::warn!(error = %e, "lifecycle tick: event log cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ChunkStore;
    use crate::storage::Storage;
    use crate::vector::VectorIndex;
    use parking_lot::RwLock;
    use std::time::Duration as StdDuration;

    fn manager() -> Arc<LifecycleManager> {
        let storage = Arc::new(Storage::in_memory().unwrap());
        let chunks = Arc::new(ChunkStore::new(storage.clone()));
        let vector_index = Arc::new(RwLock::new(VectorIndex::new().unwrap()));
        Arc::new(LifecycleManager::new(storage, chunks, vector_index))
    }

    #[test]
    fn run_tick_runs_archival_only_on_sixth_hour() {
        let mgr = manager();
        // exercised indirectly via demote/archive call counts would require
        // instrumentation; this just confirms the tick doesn't panic at
        // either boundary.
        run_tick(&mgr, 0);
        run_tick(&mgr, 5);
        run_tick(&mgr, 6);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_joins_cleanly() {
        let mgr = manager();
        let mut scheduler = LifecycleScheduler::with_interval(mgr, StdDuration::from_millis(20));
        scheduler.start();
        assert!(scheduler.is_running());
        scheduler.start();
        assert!(scheduler.is_running());
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }
}
