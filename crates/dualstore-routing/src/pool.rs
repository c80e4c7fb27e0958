//! Shadow writer pool
//!
//! Bounded background executor for secondary-store writes:
//! - Fixed worker count sharing one bounded queue
//! - Non-blocking submission; a full queue drops the job with a warning
//! - Failures and panics are logged and counted, never propagated
//! - Idle wait and graceful shutdown
//!
//! Must be created inside a Tokio runtime.

use crate::config::Store;
use crate::error::ShadowPoolError;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Default worker count
pub const DEFAULT_WORKERS: usize = 4;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Metric name for shadow write outcomes
pub const SHADOW_WRITES_METRIC: &str = "dualstore_shadow_writes_total";

/// Boxed secondary write
pub type ShadowTask = BoxFuture<'static, Result<(), String>>;

struct ShadowJob {
    operation: &'static str,
    store: Store,
    task: ShadowTask,
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowPoolStats {
    /// Jobs accepted into the queue
    pub submitted: u64,
    /// Jobs that completed with `Ok`
    pub succeeded: u64,
    /// Jobs that returned an error or panicked
    pub failed: u64,
    /// Jobs rejected at submission
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct PoolState {
    in_flight: AtomicUsize,
    idle: Notify,
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl PoolState {
    fn finish_one(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Bounded pool executing shadow writes off the request path
#[derive(Debug)]
pub struct ShadowWriterPool {
    sender: Mutex<Option<mpsc::Sender<ShadowJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    state: Arc<PoolState>,
    capacity: usize,
}

impl std::fmt::Debug for ShadowJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowJob")
            .field("operation", &self.operation)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ShadowWriterPool {
    /// Create pool and spawn workers
    ///
    /// Zero values are raised to one.
    #[must_use]
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel::<ShadowJob>(capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let state = Arc::new(PoolState::default());

        let handles = (0..workers)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(job) = next else { break };
                        Self::execute(worker, job, &state).await;
                    }
                    debug!(worker, "shadow worker stopped");
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            state,
            capacity,
        }
    }

    async fn execute(worker: usize, job: ShadowJob, state: &PoolState) {
        let ShadowJob {
            operation,
            store,
            task,
        } = job;

        let outcome = match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => {
                debug!(worker, operation, %store, "shadow write completed");
                state.succeeded.fetch_add(1, Ordering::Relaxed);
                "succeeded"
            }
            Ok(Err(reason)) => {
                warn!(worker, operation, %store, error = %reason, "shadow write failed");
                state.failed.fetch_add(1, Ordering::Relaxed);
                "failed"
            }
            Err(_) => {
                error!(worker, operation, %store, "shadow write panicked");
                state.failed.fetch_add(1, Ordering::Relaxed);
                "panicked"
            }
        };

        metrics::counter!(SHADOW_WRITES_METRIC, "operation" => operation, "outcome" => outcome)
            .increment(1);
        state.finish_one();
    }

    /// Queue a secondary write without waiting
    ///
    /// # Errors
    /// - `ShadowPoolError::QueueFull` if the queue is at capacity
    /// - `ShadowPoolError::Closed` after shutdown
    pub fn submit<F>(&self, operation: &'static str, store: Store, task: F) -> Result<(), ShadowPoolError>
    where
        F: Future<Output = Result<(), String>> + Send + 'static,
    {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(self.reject(operation, store, ShadowPoolError::Closed));
        };

        self.state.in_flight.fetch_add(1, Ordering::AcqRel);
        let job = ShadowJob {
            operation,
            store,
            task: task.boxed(),
        };

        match sender.try_send(job) {
            Ok(()) => {
                self.state.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.state.finish_one();
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => ShadowPoolError::QueueFull(self.capacity),
                    mpsc::error::TrySendError::Closed(_) => ShadowPoolError::Closed,
                };
                Err(self.reject(operation, store, reason))
            }
        }
    }

    fn reject(&self, operation: &'static str, store: Store, reason: ShadowPoolError) -> ShadowPoolError {
        warn!(operation, %store, error = %reason, "shadow write dropped");
        self.state.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(SHADOW_WRITES_METRIC, "operation" => operation, "outcome" => "dropped")
            .increment(1);
        reason
    }

    /// Wait until every accepted job has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            if self.state.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting jobs, drain the queue and join workers
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "shadow worker join failed");
            }
        }
    }

    /// Whether shutdown has started
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Jobs accepted and not yet finished
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::Acquire)
    }

    /// Queue capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot statistics
    #[must_use]
    pub fn stats(&self) -> ShadowPoolStats {
        ShadowPoolStats {
            submitted: self.state.submitted.load(Ordering::Relaxed),
            succeeded: self.state.succeeded.load(Ordering::Relaxed),
            failed: self.state.failed.load(Ordering::Relaxed),
            dropped: self.state.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for ShadowWriterPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_QUEUE_CAPACITY)
    }
}
