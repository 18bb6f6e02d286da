// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
///
/// Everything the monitor does on disk goes through this trait so the
/// classifier, batch builder and orchestrator can run against
/// [`mock::MockFileSystem`] in tests.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether the entry can be opened for reading.
    ///
    /// Missing entries and permission failures answer `false`; any other I/O
    /// failure while probing is an error.
    fn is_readable(&self, path: &Path) -> Result<bool>;

    /// Last modification time in milliseconds since the Unix epoch.
    fn modified_ms(&self, path: &Path) -> Result<u64>;

    /// Delete a file. Returns `false` if it was already gone.
    fn remove_file(&self, path: &Path) -> Result<bool>;

    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_readable(&self, path: &Path) -> Result<bool> {
        if path.is_dir() {
            return Ok(fs::read_dir(path).is_ok());
        }
        match fs::File::open(path) {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("probing readability of {:?}", path)),
        }
    }

    fn modified_ms(&self, path: &Path) -> Result<u64> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("reading modification time of {:?}", path))?;
        let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        Ok(since_epoch.as_millis() as u64)
    }

    fn remove_file(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("deleting file {:?}", path)),
        }
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("canonicalizing {:?}", path))
    }
}
