// src/engine/listener.rs

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error};

/// Callback invoked once after a batch commits, after the grace delay.
pub trait HotswapListener: Send + Sync {
    fn after_hotswap(&self) -> Result<()>;
}

impl<F> HotswapListener for F
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn after_hotswap(&self) -> Result<()> {
        self()
    }
}

/// Explicitly registered listeners.
///
/// Clones share the same list.
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Arc<RwLock<Vec<Arc<dyn HotswapListener>>>>,
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish()
    }
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn HotswapListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener once. A failing or panicking listener is logged
    /// and does not stop the others.
    pub fn notify_all(&self) {
        let listeners: Vec<Arc<dyn HotswapListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (index, listener) in listeners.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener.after_hotswap())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(listener = index, error = %err, "hotswap listener failed");
                }
                Err(_) => {
                    error!(listener = index, "hotswap listener panicked");
                }
            }
        }
    }

    /// Notify all listeners once `grace` has elapsed.
    ///
    /// Runs on the ambient Tokio runtime when there is one, otherwise on a
    /// short-lived thread.
    pub fn schedule(&self, grace: Duration) {
        if self.is_empty() {
            return;
        }
        debug!(grace_ms = grace.as_millis() as u64, "scheduling hotswap listeners");
        let set = self.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    if let Err(err) = tokio::task::spawn_blocking(move || set.notify_all()).await {
                        error!(error = %err, "listener notification task failed");
                    }
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(grace);
                    set.notify_all();
                });
            }
        }
    }
}
