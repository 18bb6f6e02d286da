use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use hotswap::errors::HotswapError;
use hotswap::watch::{BurstFuture, RawChange, WatchSource};
use tokio::sync::{mpsc, Notify};

enum Script {
    Burst(Vec<RawChange>),
    Fail(String),
}

/// A watch source driven by the test.
///
/// - `push_burst` hands the next burst to the watch loop.
/// - `fail` makes the next `next_burst` return `WatchFatalError`.
/// - `watched_dirs` lists every directory the monitor asked to watch.
pub struct ScriptedWatchSource {
    tx: mpsc::UnboundedSender<Script>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Script>>,
    watched: Mutex<Vec<PathBuf>>,
    closed: AtomicBool,
    closed_notify: Notify,
}

impl ScriptedWatchSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            watched: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            closed_notify: Notify::new(),
        }
    }

    pub fn push_burst(&self, changes: Vec<RawChange>) {
        let _ = self.tx.send(Script::Burst(changes));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.tx.send(Script::Fail(reason.to_string()));
    }

    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedWatchSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchSource for ScriptedWatchSource {
    fn watch_dir(&self, dir: &Path) -> hotswap::errors::Result<()> {
        if self.is_closed() {
            return Err(HotswapError::StoppedError);
        }
        let mut watched = self.watched.lock().unwrap();
        if !watched.iter().any(|d| d == dir) {
            watched.push(dir.to_path_buf());
        }
        Ok(())
    }

    fn next_burst(&self) -> BurstFuture<'_> {
        Box::pin(async move {
            let closed = self.closed_notify.notified();
            if self.is_closed() {
                return Ok(None);
            }
            let mut rx = self.rx.lock().await;
            tokio::select! {
                _ = closed => Ok(None),
                script = rx.recv() => match script {
                    Some(Script::Burst(changes)) => Ok(Some(changes)),
                    Some(Script::Fail(reason)) => Err(HotswapError::WatchFatalError(reason)),
                    None => Ok(None),
                },
            }
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.closed_notify.notify_waiters();
    }
}
