// src/watch/classify.rs

//! Change classification.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::source::{ChangeKind, RawChange};

/// Typed view of a raw change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Ignored,
    /// A file outside the artifact root; may have a reload target.
    SingleResource(PathBuf),
    /// A file directly inside the artifact root.
    CodeArtifact(PathBuf),
}

/// True for entries the monitor never acts on: hidden, missing or
/// unreadable entries, and directories.
///
/// A failing readability probe is returned as an error.
pub fn should_ignore(fs: &dyn FileSystem, path: &Path) -> Result<bool> {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    if hidden || fs.is_dir(path) {
        return Ok(true);
    }
    Ok(!fs.is_readable(path)?)
}

#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    artifact_root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl ChangeClassifier {
    /// `artifact_root` is canonicalized once so it compares equal to the
    /// absolute directories reported by the watcher.
    pub fn new(artifact_root: &Path, fs: Arc<dyn FileSystem>) -> Self {
        let artifact_root = fs
            .canonicalize(artifact_root)
            .unwrap_or_else(|_| artifact_root.to_path_buf());
        Self { artifact_root, fs }
    }

    pub fn artifact_root(&self) -> &Path {
        &self.artifact_root
    }

    fn is_artifact_root(&self, directory: &Path) -> bool {
        if directory == self.artifact_root {
            return true;
        }
        self.fs
            .canonicalize(directory)
            .map(|d| d == self.artifact_root)
            .unwrap_or(false)
    }

    /// Classify one `(directory, item)` change. Pure apart from the
    /// filesystem probes.
    pub fn classify(&self, change: &RawChange) -> Result<Change> {
        if matches!(change.kind, ChangeKind::Removed | ChangeKind::Other) {
            return Ok(Change::Ignored);
        }

        let path = change.path();
        if should_ignore(self.fs.as_ref(), &path)? {
            return Ok(Change::Ignored);
        }

        if self.is_artifact_root(&change.directory) {
            Ok(Change::CodeArtifact(path))
        } else {
            Ok(Change::SingleResource(path))
        }
    }
}
