// src/engine/batch.rs

//! Batch transaction builder.
//!
//! Turns the code-artifact paths of one drain cycle into a validated,
//! partitioned batch. Any malformed artifact or inconsistency rejects the
//! whole batch: a partially applied batch is worse than none.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::artifact::{content_hash, expand, ArtifactDecoder, FingerprintCache};
use crate::config::MonitorSettings;
use crate::engine::patcher::{PatchUnit, Patcher};
use crate::errors::{HotswapError, Result};
use crate::fs::FileSystem;
use crate::types::ArtifactSummary;
use crate::watch::classify::should_ignore;

/// One artifact as delivered, before validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// File path, or synthetic `<container>!/<member>` path.
    pub source: String,
    pub last_modified_ms: u64,
    pub bytes: Vec<u8>,
}

/// Output of a successful validation pass.
#[derive(Debug, Default)]
pub struct ValidatedBatch {
    pub new_artifacts: Vec<PatchUnit>,
    pub updated_artifacts: Vec<PatchUnit>,
    /// Summaries of every artifact in the two lists above.
    pub summaries: Vec<ArtifactSummary>,
    /// Files that fed this batch; deleted on commit.
    pub consumed: Vec<PathBuf>,
    /// Candidates dropped as unchanged or duplicated.
    pub skipped: usize,
}

impl ValidatedBatch {
    /// True when there is nothing to hand to the patcher.
    pub fn is_empty(&self) -> bool {
        self.new_artifacts.is_empty() && self.updated_artifacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new_artifacts.len() + self.updated_artifacts.len()
    }
}

pub struct BatchBuilder<'a> {
    fs: &'a dyn FileSystem,
    settings: &'a MonitorSettings,
    /// Canonical form of `settings.artifact_root`.
    artifact_root: PathBuf,
    cache: &'a FingerprintCache,
    decoder: &'a dyn ArtifactDecoder,
    patcher: &'a dyn Patcher,
}

impl<'a> BatchBuilder<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        settings: &'a MonitorSettings,
        cache: &'a FingerprintCache,
        decoder: &'a dyn ArtifactDecoder,
        patcher: &'a dyn Patcher,
    ) -> Self {
        let artifact_root = fs
            .canonicalize(&settings.artifact_root)
            .unwrap_or_else(|_| settings.artifact_root.clone());
        Self {
            fs,
            settings,
            artifact_root,
            cache,
            decoder,
            patcher,
        }
    }

    /// Validate every artifact reachable from `paths`.
    ///
    /// Containers are expanded member by member; loose files with the
    /// artifact suffix are read whole; anything else is skipped. Entries that
    /// vanished or became unreadable since classification are skipped too,
    /// and so are files that do not sit directly in the artifact root: they
    /// are neither applied nor deleted.
    pub fn build(&self, paths: &[PathBuf]) -> Result<ValidatedBatch> {
        let mut batch = ValidatedBatch::default();
        // logical name -> content hash, within this batch
        let mut seen: HashMap<String, String> = HashMap::new();

        for path in paths {
            if batch.consumed.contains(path) || should_ignore(self.fs, path)? {
                continue;
            }
            if !self.in_artifact_root(path) {
                warn!(?path, root = ?self.artifact_root, "outside the artifact root; skipping");
                continue;
            }
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };

            if file_name.ends_with(&self.settings.container_suffix) {
                for member in expand(self.fs, path, &self.settings.artifact_suffix)? {
                    let member = member?;
                    self.admit(
                        &mut batch,
                        &mut seen,
                        Candidate {
                            source: member.synthetic_path,
                            last_modified_ms: member.last_modified_ms,
                            bytes: member.bytes,
                        },
                    )?;
                }
            } else if file_name.ends_with(&self.settings.artifact_suffix) {
                let candidate = self.read_candidate(path)?;
                self.admit(&mut batch, &mut seen, candidate)?;
            } else {
                debug!(?path, "not an artifact or container; skipping");
                continue;
            }

            batch.consumed.push(path.clone());
        }

        Ok(batch)
    }

    fn in_artifact_root(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        parent == self.artifact_root
            || self
                .fs
                .canonicalize(parent)
                .is_ok_and(|p| p == self.artifact_root)
    }

    fn read_candidate(&self, path: &Path) -> Result<Candidate> {
        Ok(Candidate {
            source: path.display().to_string(),
            last_modified_ms: self.fs.modified_ms(path)?,
            bytes: self.fs.read(path)?,
        })
    }

    fn admit(
        &self,
        batch: &mut ValidatedBatch,
        seen: &mut HashMap<String, String>,
        candidate: Candidate,
    ) -> Result<()> {
        let Candidate {
            source,
            last_modified_ms,
            bytes,
        } = candidate;
        debug!(source = %source, "checking artifact");

        let name = self
            .decoder
            .logical_name(&bytes)
            .map_err(|e| HotswapError::ParseError {
                path: source.clone(),
                reason: e.to_string(),
            })?;

        let prior = self.cache.get(&name);
        if let Some(prior) = &prior {
            if prior.last_modified_ms == last_modified_ms {
                info!(source = %source, name = %name, "modification time unchanged; skipping");
                batch.skipped += 1;
                return Ok(());
            }
        }

        if let Some(previous) = self.cache.name_for_source(&source) {
            if previous != name {
                return Err(HotswapError::CorruptBatchError(format!(
                    "'{source}' previously delivered '{previous}' but now contains '{name}'"
                )));
            }
        }

        let hash = content_hash(&bytes);
        if let Some(prior) = &prior {
            if prior.hash == hash {
                info!(source = %source, name = %name, "content unchanged; skipping");
                batch.skipped += 1;
                return Ok(());
            }
        }

        match seen.get(&name) {
            Some(seen_hash) if *seen_hash == hash => {
                debug!(source = %source, name = %name, "duplicate artifact in batch; skipping");
                batch.skipped += 1;
                return Ok(());
            }
            Some(_) => {
                return Err(HotswapError::CorruptBatchError(format!(
                    "'{name}' delivered twice in one batch with different content"
                )));
            }
            None => {}
        }
        seen.insert(name.clone(), hash.clone());

        info!(source = %source, name = %name, "artifact passed checks");

        let is_update = prior.is_some() || self.patcher.is_loaded(&name);
        batch.summaries.push(ArtifactSummary {
            name: name.clone(),
            source,
            last_modified_ms,
            hash,
        });
        let unit = PatchUnit { name, bytes };
        if is_update {
            batch.updated_artifacts.push(unit);
        } else {
            batch.new_artifacts.push(unit);
        }
        Ok(())
    }
}
