//! Hands accepted connections to tokio tasks and tracks which are still running.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::server::shutdown::Shutdown;

#[derive(Debug, Default)]
struct ActiveWorkers {
    ids: Mutex<HashSet<u64>>,
    next_id: AtomicU64,
    idle: Notify,
}

impl ActiveWorkers {
    fn ids(&self) -> MutexGuard<'_, HashSet<u64>> {
        // The set stays consistent even if a holder panicked.
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Removes a worker from the active set when its task ends, however it ends.
struct WorkerGuard {
    id: u64,
    workers: Arc<ActiveWorkers>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let mut ids = self.workers.ids();
        ids.remove(&self.id);
        if ids.is_empty() {
            self.workers.idle.notify_waiters();
        }
    }
}

/// Result of [`WorkerDispatcher::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Workers running when the drain started.
    pub in_flight: usize,
    /// Workers still running when the grace period ran out.
    pub cancelled: usize,
}

/// Runs one task per connection on the tokio runtime.
///
/// There is no admission limit; the runtime's scheduler grows and reuses
/// threads as needed.
#[derive(Debug, Clone)]
pub struct WorkerDispatcher {
    workers: Arc<ActiveWorkers>,
    cancel: Shutdown,
}

impl WorkerDispatcher {
    pub fn new() -> Self {
        Self {
            workers: Arc::new(ActiveWorkers::default()),
            cancel: Shutdown::new(),
        }
    }

    /// Token handed to every worker; raised when a drain runs out of time.
    pub fn cancel_token(&self) -> Shutdown {
        self.cancel.clone()
    }

    /// Spawns `task`, registering it as active until it completes.
    pub fn submit<F>(&self, task: F) -> u64
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.workers.next_id.fetch_add(1, Ordering::Relaxed);
        self.workers.ids().insert(id);

        let guard = WorkerGuard {
            id,
            workers: Arc::clone(&self.workers),
        };
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
        id
    }

    pub fn active(&self) -> usize {
        self.workers.ids().len()
    }

    /// Resolves once no workers are running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.workers.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Lets in-flight workers finish for up to `grace`, then cancels the rest
    /// and waits for them to unwind.
    pub async fn drain(&self, grace: Duration) -> DrainReport {
        let in_flight = self.active();
        info!(in_flight, grace_ms = grace.as_millis() as u64, "Draining workers");

        if tokio::time::timeout(grace, self.wait_idle()).await.is_ok() {
            return DrainReport {
                in_flight,
                cancelled: 0,
            };
        }

        let cancelled = self.active();
        warn!(cancelled, "Grace period elapsed, cancelling remaining workers");
        self.cancel.trigger();
        self.wait_idle().await;

        DrainReport {
            in_flight,
            cancelled,
        }
    }
}

impl Default for WorkerDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
