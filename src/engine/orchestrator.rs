// src/engine/orchestrator.rs

//! Apply orchestrator.
//!
//! State machine: `Idle -> Applying -> {Committed, Aborted} -> Idle`.
//! A single slot lock covers validation and application, so batches are
//! processed strictly one at a time even when several are queued on the
//! dispatch pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::artifact::{ArtifactDecoder, FingerprintCache};
use crate::config::MonitorSettings;
use crate::engine::batch::{BatchBuilder, ValidatedBatch};
use crate::engine::listener::ListenerSet;
use crate::engine::patcher::Patcher;
use crate::errors::{HotswapError, Result};
use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Applying,
    Committed,
    Aborted,
}

/// Result of one `apply_batch` call.
#[derive(Debug)]
pub enum TxOutcome {
    /// Nothing to apply: every candidate was unchanged, duplicated or not an
    /// artifact. No state was touched.
    NoChange,
    Committed { introduced: usize, redefined: usize },
    /// Validation or application failed. Cache and files are untouched.
    Aborted(HotswapError),
}

impl TxOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TxOutcome::Aborted(_))
    }
}

pub struct ApplyOrchestrator {
    settings: MonitorSettings,
    fs: Arc<dyn FileSystem>,
    cache: Arc<FingerprintCache>,
    decoder: Arc<dyn ArtifactDecoder>,
    patcher: Arc<dyn Patcher>,
    listeners: ListenerSet,
    slot: Mutex<()>,
    state: Mutex<TxState>,
}

impl std::fmt::Debug for ApplyOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyOrchestrator")
            .field("state", &self.state())
            .field("cached", &self.cache.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl ApplyOrchestrator {
    pub fn new(
        settings: MonitorSettings,
        fs: Arc<dyn FileSystem>,
        cache: Arc<FingerprintCache>,
        decoder: Arc<dyn ArtifactDecoder>,
        patcher: Arc<dyn Patcher>,
        listeners: ListenerSet,
    ) -> Self {
        Self {
            settings,
            fs,
            cache,
            decoder,
            patcher,
            listeners,
            slot: Mutex::new(()),
            state: Mutex::new(TxState::Idle),
        }
    }

    pub fn state(&self) -> TxState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache(&self) -> &Arc<FingerprintCache> {
        &self.cache
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    fn set_state(&self, next: TxState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = ?*state, to = ?next, "transaction state");
        *state = next;
    }

    /// Validate and apply the artifacts reachable from `paths` as one
    /// transaction. Blocks while another batch is being applied.
    pub fn apply_batch(&self, paths: &[PathBuf]) -> TxOutcome {
        let _slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();
        info!(files = paths.len(), "hotswap start...");

        let outcome = self.run(paths);

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ?outcome,
            "...hotswap finished"
        );
        outcome
    }

    fn run(&self, paths: &[PathBuf]) -> TxOutcome {
        let builder = BatchBuilder::new(
            self.fs.as_ref(),
            &self.settings,
            &self.cache,
            self.decoder.as_ref(),
            self.patcher.as_ref(),
        );
        let batch = match builder.build(paths) {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, "batch validation failed; hotswap aborted");
                return TxOutcome::Aborted(err);
            }
        };

        if batch.is_empty() {
            debug!(skipped = batch.skipped, "no changed artifacts in batch");
            return TxOutcome::NoChange;
        }

        self.set_state(TxState::Applying);
        let outcome = match self.commit(batch) {
            Ok((introduced, redefined)) => {
                self.set_state(TxState::Committed);
                self.listeners.schedule(self.settings.listener_grace);
                TxOutcome::Committed {
                    introduced,
                    redefined,
                }
            }
            Err(err) => {
                self.set_state(TxState::Aborted);
                error!(error = %err, "hotswap failed; source files kept for retry");
                TxOutcome::Aborted(err)
            }
        };
        self.set_state(TxState::Idle);
        outcome
    }

    fn commit(&self, batch: ValidatedBatch) -> Result<(usize, usize)> {
        let ValidatedBatch {
            new_artifacts,
            updated_artifacts,
            summaries,
            consumed,
            ..
        } = batch;

        if !new_artifacts.is_empty() {
            self.patcher
                .introduce_new(&new_artifacts)
                .map_err(|e| HotswapError::PatchError(format!("introducing new artifacts: {e:#}")))?;
            for unit in &new_artifacts {
                info!(name = %unit.name, "load new artifact success");
            }
        }

        if !updated_artifacts.is_empty() {
            self.patcher
                .redefine_existing(&updated_artifacts)
                .map_err(|e| HotswapError::PatchError(format!("redefining artifacts: {e:#}")))?;
            for unit in &updated_artifacts {
                info!(name = %unit.name, "redefine loaded artifact success");
            }
        }

        // Files go before the cache: a failed delete must leave the cache as it was.
        for path in &consumed {
            if !self.fs.remove_file(path)? {
                debug!(?path, "consumed file already deleted");
            }
        }

        self.cache.commit(summaries);
        Ok((new_artifacts.len(), updated_artifacts.len()))
    }
}
