//! Recalculation coordinator module
//!
//! Per-project debounce and cooldown around recalculations. A burst of
//! events collapses into one trailing run; the engine's own field writes
//! echo back as project-item events, and the cooldown window swallows them
//! so a run cannot trigger itself recursively.

use moka::sync::Cache;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// (installation id, project number)
pub type ProjectKey = (i64, u64);

/// Debounce delay before a scheduled recalculation starts
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(1_000);
/// Quiet period after a recalculation finishes
const COOLDOWN_WINDOW: Duration = Duration::from_millis(5_000);
/// Bound on tracked keys in either state
const MAX_TRACKED_KEYS: u64 = 500;

/// Debounce + cooldown coordinator for recalculations
///
/// Both the pending set and the cooldown set are bounded with TTL eviction
/// so abandoned keys cannot leak.
pub struct RecalcCoordinator {
    pending: Mutex<HashMap<ProjectKey, JoinHandle<()>>>,
    cooldown: Cache<ProjectKey, ()>,
    debounce: Duration,
}

impl RecalcCoordinator {
    pub fn new() -> Self {
        Self::with_windows(DEBOUNCE_WINDOW, COOLDOWN_WINDOW)
    }

    /// Custom windows for tests
    pub fn with_windows(debounce: Duration, cooldown: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            cooldown: Cache::builder()
                .max_capacity(MAX_TRACKED_KEYS)
                .time_to_live(cooldown)
                .build(),
            debounce,
        }
    }

    /// Whether the key is currently running or cooling down
    pub fn in_cooldown(&self, key: ProjectKey) -> bool {
        self.cooldown.contains_key(&key)
    }

    /// Schedules a debounced run of `job` for the key
    ///
    /// A second request within the debounce window replaces the pending
    /// timer, coalescing the burst. Requests during a run or its cooldown
    /// are dropped silently.
    pub fn schedule<F, Fut>(self: &Arc<Self>, key: ProjectKey, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.in_cooldown(key) {
            debug!("recalc for {:?} dropped: cooldown active", key);
            return;
        }

        let mut pending = self.pending.lock().unwrap();

        if let Some(previous) = pending.remove(&key) {
            previous.abort();
        }

        // Bound the pending set; evict an arbitrary stale timer if full
        if pending.len() as u64 >= MAX_TRACKED_KEYS {
            if let Some(&oldest) = pending.keys().next() {
                if let Some(evicted) = pending.remove(&oldest) {
                    evicted.abort();
                    debug!("pending recalc for {:?} evicted: set full", oldest);
                }
            }
        }

        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(coordinator.debounce).await;

            coordinator.pending.lock().unwrap().remove(&key);

            // Mark the key for the whole run so echoed events are dropped,
            // then refresh after the run so the cooldown counts from the
            // moment the writes finished
            coordinator.cooldown.insert(key, ());
            job().await;
            coordinator.cooldown.insert(key, ());
        });

        pending.insert(key, handle);
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl Default for RecalcCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
