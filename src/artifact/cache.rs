// src/artifact/cache.rs

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::types::ArtifactSummary;

#[derive(Debug, Default)]
struct CacheInner {
    by_name: HashMap<String, ArtifactSummary>,
    /// source identity -> logical name last committed from it
    by_source: HashMap<String, String>,
}

/// Last committed state of every artifact, keyed by logical name.
///
/// Only [`FingerprintCache::commit`] mutates it, and the apply orchestrator
/// calls that strictly after a transaction succeeded. Validation reads it to
/// skip no-op changes.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    inner: RwLock<CacheInner>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<ArtifactSummary> {
        self.read().by_name.get(name).cloned()
    }

    /// Logical name last committed from `source`, if any.
    pub fn name_for_source(&self, source: &str) -> Option<String> {
        self.read().by_source.get(source).cloned()
    }

    /// Merge the summaries of a committed batch.
    pub fn commit<I>(&self, summaries: I)
    where
        I: IntoIterator<Item = ArtifactSummary>,
    {
        let mut inner = self.write();
        for summary in summaries {
            debug!(name = %summary.name, hash = %summary.hash, "recording artifact fingerprint");
            inner
                .by_source
                .insert(summary.source.clone(), summary.name.clone());
            inner.by_name.insert(summary.name.clone(), summary);
        }
    }

    /// All recorded summaries, sorted by name.
    pub fn snapshot(&self) -> Vec<ArtifactSummary> {
        let mut all: Vec<ArtifactSummary> = self.read().by_name.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
