// src/watch/registry.rs

//! Reload target registry.
//!
//! Maps the fingerprint of a watched file name to the handler that reloads
//! it, and keeps the set of directories handed to the watch source.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Result as AnyResult;
use tracing::{debug, info};

use crate::errors::{HotswapError, Result};
use crate::fs::FileSystem;
use crate::types::Fingerprint;
use crate::watch::source::WatchSource;

/// Reloads one resource from fresh file content.
pub trait ReloadHandler: Send + Sync {
    fn reload(&self, bytes: &[u8]) -> AnyResult<()>;
}

impl<F> ReloadHandler for F
where
    F: Fn(&[u8]) -> AnyResult<()> + Send + Sync,
{
    fn reload(&self, bytes: &[u8]) -> AnyResult<()> {
        self(bytes)
    }
}

/// A registered file and its handler. Immutable once registered.
pub struct ReloadTarget {
    path: PathBuf,
    fingerprint: Fingerprint,
    handler: Arc<dyn ReloadHandler>,
}

impl std::fmt::Debug for ReloadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadTarget")
            .field("path", &self.path)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl ReloadTarget {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn reload(&self, bytes: &[u8]) -> AnyResult<()> {
        self.handler.reload(bytes)
    }
}

type TargetMap = HashMap<Fingerprint, Arc<ReloadTarget>>;

pub struct ReloadRegistry {
    /// `None` once the registry has been shut down.
    targets: RwLock<Option<TargetMap>>,
    watch_dirs: Mutex<HashSet<PathBuf>>,
    source: Arc<dyn WatchSource>,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for ReloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadRegistry")
            .field("targets", &self.len())
            .field("watch_dirs", &self.watch_dirs())
            .finish_non_exhaustive()
    }
}

impl ReloadRegistry {
    pub fn new(source: Arc<dyn WatchSource>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            targets: RwLock::new(Some(HashMap::new())),
            watch_dirs: Mutex::new(HashSet::new()),
            source,
            fs,
        }
    }

    /// Register `path` for single-resource reloads.
    ///
    /// Check and insert happen under one write lock, so two concurrent
    /// registrations of the same fingerprint cannot both succeed. The parent
    /// directory is added to the watch set before the target becomes
    /// visible; if that fails nothing is registered.
    pub fn register(&self, path: impl AsRef<Path>, handler: Arc<dyn ReloadHandler>) -> Result<Fingerprint> {
        let path = path.as_ref();
        if self.fs.is_dir(path) {
            return Err(HotswapError::InvalidTargetError(path.to_path_buf()));
        }
        let fingerprint = Fingerprint::of_path(path)
            .ok_or_else(|| HotswapError::InvalidTargetError(path.to_path_buf()))?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut guard = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        let targets = guard.as_mut().ok_or(HotswapError::StoppedError)?;

        match targets.entry(fingerprint) {
            Entry::Occupied(_) => Err(HotswapError::ConflictError {
                path: path.to_path_buf(),
                fingerprint: fingerprint.to_string(),
            }),
            Entry::Vacant(slot) => {
                self.watch_directory(&parent)?;
                slot.insert(Arc::new(ReloadTarget {
                    path: path.to_path_buf(),
                    fingerprint,
                    handler,
                }));
                info!(?path, %fingerprint, "monitoring file");
                Ok(fingerprint)
            }
        }
    }

    /// Add `dir` to the watch set. Idempotent.
    pub fn watch_directory(&self, dir: &Path) -> Result<()> {
        let dir = self
            .fs
            .canonicalize(dir)
            .unwrap_or_else(|_| dir.to_path_buf());
        let mut watch_dirs = self.watch_dirs.lock().unwrap_or_else(PoisonError::into_inner);
        if watch_dirs.contains(&dir) {
            debug!(?dir, "directory already watched");
            return Ok(());
        }
        self.source.watch_dir(&dir)?;
        watch_dirs.insert(dir);
        Ok(())
    }

    pub fn lookup(&self, fingerprint: Fingerprint) -> Result<Option<Arc<ReloadTarget>>> {
        let guard = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        let targets = guard.as_ref().ok_or(HotswapError::StoppedError)?;
        Ok(targets.get(&fingerprint).cloned())
    }

    /// Look up by item name, as reported by the watcher.
    pub fn lookup_name(&self, item_name: &str) -> Result<Option<Arc<ReloadTarget>>> {
        self.lookup(Fingerprint::of_name(item_name))
    }

    /// Drop every target. Later `register`/`lookup` calls fail with
    /// `StoppedError`.
    pub fn unregister_all(&self) {
        let mut guard = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(targets) = guard.take() {
            debug!(targets = targets.len(), "unregistered all reload targets");
        }
    }

    pub fn len(&self) -> usize {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .watch_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        dirs.sort();
        dirs
    }
}
