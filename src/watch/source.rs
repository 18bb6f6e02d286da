// src/watch/source.rs

//! Raw change events.
//!
//! [`WatchSource`] is the blocking event primitive seen by the watch loop:
//! register directories, then await bursts of `(directory, item, kind)`
//! changes. [`NotifyWatchSource`] backs it with the platform watcher from
//! `notify`; tests substitute a scripted source.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{HotswapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Other,
}

/// One change reported by the watch primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    /// The watched directory the item lives in.
    pub directory: PathBuf,
    pub item_name: String,
    pub kind: ChangeKind,
}

impl RawChange {
    pub fn new(directory: impl Into<PathBuf>, item_name: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            directory: directory.into(),
            item_name: item_name.into(),
            kind,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.item_name)
    }
}

pub type BurstFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Vec<RawChange>>>> + Send + 'a>>;

pub trait WatchSource: Send + Sync {
    /// Start watching `dir` (non-recursively). Watching a directory twice is
    /// harmless.
    fn watch_dir(&self, dir: &Path) -> Result<()>;

    /// Wait for the next burst of changes.
    ///
    /// - `Ok(Some(burst))`: changes in the order they were reported.
    /// - `Ok(None)`: the source was closed.
    /// - `Err(_)`: the primitive failed; the watch loop treats this as fatal.
    fn next_burst(&self) -> BurstFuture<'_>;

    /// Stop producing events. Pending and future `next_burst` calls end with
    /// `Ok(None)`.
    fn close(&self);
}

/// `notify`-backed watch source.
///
/// The `notify` callback forwards raw events into an unbounded channel; a
/// burst is the first event plus everything that arrives within the drain
/// window.
pub struct NotifyWatchSource {
    watcher: Mutex<Option<RecommendedWatcher>>,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<notify::Result<Event>>>,
    drain_window: Duration,
}

impl std::fmt::Debug for NotifyWatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatchSource")
            .field("drain_window", &self.drain_window)
            .finish_non_exhaustive()
    }
}

impl NotifyWatchSource {
    pub fn new(drain_window: Duration) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        // Closure called synchronously by notify whenever an event arrives.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // Fails only once the receiver is gone, i.e. during shutdown.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher: Mutex::new(Some(watcher)),
            events: tokio::sync::Mutex::new(event_rx),
            drain_window,
        })
    }

    fn is_closed(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

fn change_kind(kind: &EventKind) -> ChangeKind {
    match kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Other,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => ChangeKind::Other,
    }
}

/// Split notify paths into `(directory, item)` changes, dropping repeats of a
/// change already in the burst.
fn push_event(burst: &mut Vec<RawChange>, event: Event) {
    let kind = change_kind(&event.kind);
    for path in event.paths {
        let (Some(directory), Some(item_name)) = (
            path.parent(),
            path.file_name().and_then(|n| n.to_str()),
        ) else {
            continue;
        };
        let change = RawChange::new(directory, item_name, kind);
        if !burst.contains(&change) {
            burst.push(change);
        }
    }
}

impl WatchSource for NotifyWatchSource {
    fn watch_dir(&self, dir: &Path) -> Result<()> {
        let mut guard = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        let watcher = guard.as_mut().ok_or(HotswapError::StoppedError)?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        info!(dir = ?dir, "watching directory");
        Ok(())
    }

    fn next_burst(&self) -> BurstFuture<'_> {
        Box::pin(async move {
            if self.is_closed() {
                return Ok(None);
            }
            let mut events = self.events.lock().await;

            let first = match events.recv().await {
                Some(res) => res?,
                None => return Ok(None),
            };

            let mut burst = Vec::new();
            push_event(&mut burst, first);

            if !self.drain_window.is_zero() {
                tokio::time::sleep(self.drain_window).await;
            }
            while let Ok(res) = events.try_recv() {
                push_event(&mut burst, res?);
            }

            debug!(changes = burst.len(), "drained watch burst");
            Ok(Some(burst))
        })
    }

    fn close(&self) {
        // Dropping the watcher drops the sender inside its callback, which
        // closes the channel.
        let mut guard = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            info!("file watcher closed");
        }
    }
}
