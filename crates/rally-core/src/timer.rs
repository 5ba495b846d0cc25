use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

struct Scheduled {
    id: u64,
    handle: JoinHandle<()>,
}

/// Keyed, cancellable delayed tasks.
///
/// Scheduling under a key that already has a pending task replaces it.
/// Cancellation is cooperative: once a task's delay has elapsed it is
/// detached from its key and runs to completion, so callbacks must check
/// their own state before acting.
#[derive(Clone, Default)]
pub struct TimerService {
    tasks: Arc<Mutex<HashMap<String, Scheduled>>>,
    next_id: Arc<AtomicU64>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = self.tasks.clone();
        let task_key = key.clone();

        // Hold the map while spawning so a zero delay cannot fire before
        // the entry exists.
        let mut map = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = tasks.lock().unwrap_or_else(|e| e.into_inner());
                if map.get(&task_key).is_some_and(|s| s.id == id) {
                    map.remove(&task_key);
                }
            }
            task.await;
        });

        if let Some(previous) = map.insert(key.clone(), Scheduled { id, handle }) {
            debug!("Timer {} rescheduled, dropping previous task", key);
            previous.handle.abort();
        }
    }

    /// Stop the pending task for `key`. Returns false if nothing was pending.
    pub fn cancel(&self, key: &str) -> bool {
        let removed = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        match removed {
            Some(scheduled) => {
                scheduled.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
