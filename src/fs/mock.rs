// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified_ms: u64 },
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    unreadable: HashSet<PathBuf>,
    undeletable: HashSet<PathBuf>,
    probe_failures: HashSet<PathBuf>,
}

/// In-memory filesystem for tests.
///
/// Clones share the same underlying state, so a test can keep a handle while
/// the monitor owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state.entries.insert(PathBuf::from("."), MockEntry::Dir);

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) a file with modification time 0.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.add_file_at(path, content, 0);
    }

    /// Add (or replace) a file with an explicit modification time.
    pub fn add_file_at(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>, modified_ms: u64) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        state.entries.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified_ms,
            },
        );
        add_ancestors(&mut state.entries, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        state.entries.entry(path.to_path_buf()).or_insert(MockEntry::Dir);
        add_ancestors(&mut state.entries, path);
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock().entries.contains_key(path.as_ref())
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, modified_ms: u64) {
        let mut state = self.lock();
        if let Some(MockEntry::File { modified_ms: m, .. }) = state.entries.get_mut(path.as_ref()) {
            *m = modified_ms;
        }
    }

    /// Make the entry fail the readability probe.
    pub fn set_unreadable(&self, path: impl AsRef<Path>) {
        self.lock().unreadable.insert(path.as_ref().to_path_buf());
    }

    /// Make the readability probe itself fail with an I/O error.
    pub fn set_probe_failure(&self, path: impl AsRef<Path>) {
        self.lock().probe_failures.insert(path.as_ref().to_path_buf());
    }

    /// Make `remove_file` fail for this entry.
    pub fn set_undeletable(&self, path: impl AsRef<Path>) {
        self.lock().undeletable.insert(path.as_ref().to_path_buf());
    }
}

fn add_ancestors(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        entries.entry(ancestor.to_path_buf()).or_insert(MockEntry::Dir);
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.lock();
        if state.unreadable.contains(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.entries.get(path) {
            Some(MockEntry::File { content, .. }) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir))
    }

    fn is_readable(&self, path: &Path) -> Result<bool> {
        let state = self.lock();
        if state.probe_failures.contains(path) {
            return Err(anyhow!("I/O error probing {:?}", path));
        }
        Ok(state.entries.contains_key(path) && !state.unreadable.contains(path))
    }

    fn modified_ms(&self, path: &Path) -> Result<u64> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File { modified_ms, .. }) => Ok(*modified_ms),
            Some(MockEntry::Dir) => Ok(0),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        let mut state = self.lock();
        if state.undeletable.contains(path) {
            return Err(anyhow!("Permission denied while deleting {:?}", path));
        }
        match state.entries.get(path) {
            Some(MockEntry::File { .. }) => {}
            Some(MockEntry::Dir) => return Err(anyhow!("Is a directory: {:?}", path)),
            None => return Ok(false),
        }
        state.entries.remove(path);
        Ok(true)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        Ok(path.to_path_buf())
    }
}
