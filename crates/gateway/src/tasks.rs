//! Shutdown-aware set of fire-and-forget tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

/// Retains handles for listener dispatches and scheduled actions so shutdown
/// can wait for (or abort) whatever is still in flight.
#[derive(Clone, Default)]
pub struct TaskTracker {
    set: Arc<Mutex<JoinSet<()>>>,
}

impl TaskTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the current runtime and keeps its handle.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock();
        while let Some(done) = set.try_join_next() {
            log_join(done);
        }
        set.spawn(task);
    }

    /// Tasks spawned and not yet reaped.
    pub fn len(&self) -> usize {
        self.set.lock().len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.set.lock().is_empty()
    }

    /// Waits for every tracked task to finish.
    pub async fn wait(&self) {
        loop {
            let mut set = std::mem::take(&mut *self.set.lock());
            if set.is_empty() {
                return;
            }
            while let Some(done) = set.join_next().await {
                log_join(done);
            }
        }
    }

    /// Waits up to `grace` for in-flight tasks, then aborts the rest.
    /// Returns how many tasks were aborted.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + grace;
        let mut expired = false;
        let mut aborted = 0;
        loop {
            let mut set = std::mem::take(&mut *self.set.lock());
            if set.is_empty() {
                break;
            }
            while !expired {
                match tokio::time::timeout_at(deadline, set.join_next()).await {
                    Ok(Some(done)) => log_join(done),
                    Ok(None) => break,
                    Err(_) => expired = true,
                }
            }
            if expired {
                aborted += set.len();
                set.abort_all();
                while set.join_next().await.is_some() {}
            }
        }
        if aborted > 0 {
            warn!(aborted, "Aborted in-flight tasks after shutdown grace period");
        } else {
            debug!("All tracked tasks finished");
        }
        aborted
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("Tracked task panicked: {e}");
        } else {
            debug!("Tracked task cancelled: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn wait_joins_all_spawned_tasks() {
        let tracker = TaskTracker::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let counter = counter.clone();
            tracker.spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tracker.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn wait_also_joins_tasks_spawned_by_tasks() {
        let tracker = TaskTracker::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let inner = tracker.clone();
        let seen = counter.clone();
        tracker.spawn(async move {
            inner.spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                seen.fetch_add(1, Ordering::SeqCst);
            });
        });

        tracker.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_aborts_tasks_past_grace() {
        let tracker = TaskTracker::new();
        tracker.spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        tracker.spawn(async {});

        let aborted = tracker.shutdown(Duration::from_millis(20)).await;
        assert_eq!(aborted, 1);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn panicking_task_does_not_poison_tracker() {
        let tracker = TaskTracker::new();
        tracker.spawn(async { panic!("listener bug") });
        tracker.wait().await;

        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        tracker.spawn(async move {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        tracker.wait().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
