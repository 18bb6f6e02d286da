use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifact::hash::name_digest;

/// Registry key for a single-resource reload target.
///
/// Derived from the file *name* only, so a target keeps its identity when the
/// directory it lives in is relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of_name(item_name: &str) -> Self {
        Fingerprint(name_digest(item_name))
    }

    /// Fingerprint of a path's final component; `None` for paths like `/` or `..`.
    pub fn of_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(Self::of_name)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// What survives of an artifact once its batch commits.
///
/// This is the unit of the fingerprint cache and of the status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    /// Logical name read from the artifact's own bytes.
    pub name: String,
    /// Where the artifact came from (file path or synthetic archive member path).
    pub source: String,
    pub last_modified_ms: u64,
    /// blake3 hex digest of the artifact bytes.
    pub hash: String,
}
