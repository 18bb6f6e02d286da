// src/exec/pool.rs

//! Bounded, elastic worker pool for reload and apply work.
//!
//! Jobs are synchronous closures run on Tokio's blocking pool; a semaphore
//! caps how many run at once. Threads come and go with demand, so the pool is
//! bounded above by the permit count and below by one worker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::{HotswapError, Result};

/// Clamp a requested worker count into `1..=available_parallelism`.
pub fn effective_workers(requested: Option<usize>) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.unwrap_or(available).clamp(1, available)
}

struct PoolInner {
    name: String,
    permits: Arc<Semaphore>,
    workers: usize,
    stopped: AtomicBool,
    /// Jobs accepted but not yet finished.
    pending: AtomicUsize,
    idle: Notify,
    handle: Handle,
}

impl PoolInner {
    fn finish_job(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Cloneable handle to a shared pool.
#[derive(Clone)]
pub struct DispatchPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for DispatchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPool")
            .field("name", &self.inner.name)
            .field("workers", &self.inner.workers)
            .field("stopped", &self.is_stopped())
            .field("pending", &self.pending())
            .finish()
    }
}

impl DispatchPool {
    /// Create a pool bound to the current Tokio runtime.
    ///
    /// `workers` is clamped into `1..=available_parallelism`. Must be called
    /// from within a runtime.
    pub fn new(name: impl Into<String>, workers: usize) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| HotswapError::ConfigError(format!("dispatch pool needs a Tokio runtime: {e}")))?;
        let workers = effective_workers(Some(workers));
        let name = name.into();
        info!(pool = %name, workers, "dispatch pool started");
        Ok(Self {
            inner: Arc::new(PoolInner {
                name,
                permits: Arc::new(Semaphore::new(workers)),
                workers,
                stopped: AtomicBool::new(false),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
                handle,
            }),
        })
    }

    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Queue `job`. Fails with `StoppedError` after shutdown.
    ///
    /// Jobs start in submission order as permits free up; they may finish in
    /// any order.
    pub fn execute<F>(&self, label: &'static str, job: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        if self.is_stopped() {
            self.inner.finish_job();
            return Err(HotswapError::StoppedError);
        }

        let inner = Arc::clone(&self.inner);
        let permits = Arc::clone(&self.inner.permits);
        Ok(self.inner.handle.spawn(async move {
            match permits.acquire_owned().await {
                Ok(_permit) => {
                    debug!(pool = %inner.name, job = label, "job started");
                    if let Err(err) = tokio::task::spawn_blocking(job).await {
                        error!(pool = %inner.name, job = label, error = %err, "job panicked");
                    }
                }
                Err(_) => {
                    error!(pool = %inner.name, job = label, "pool closed before job could start");
                }
            }
            inner.finish_job();
        }))
    }

    /// Stop accepting work and wait for queued and running jobs to finish.
    ///
    /// Nothing is cancelled. Calling it again after the first drain returns
    /// immediately.
    pub async fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(pool = %self.inner.name, pending = self.pending(), "dispatch pool draining");
        loop {
            let idle = self.inner.idle.notified();
            if self.pending() == 0 {
                break;
            }
            idle.await;
        }
        info!(pool = %self.inner.name, "dispatch pool drained");
    }
}
