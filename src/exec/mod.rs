// src/exec/mod.rs

//! Off-watch-thread execution.
//!
//! - [`pool`] owns the bounded worker pool.
//! - [`reload`] runs single-resource reloads on it.
//! - [`dispatch_batch`] queues a code-artifact batch for the orchestrator.

pub mod pool;
pub mod reload;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::engine::ApplyOrchestrator;
use crate::errors::Result;

pub use pool::{effective_workers, DispatchPool};
pub use reload::{dispatch_reload, run_reload};

/// Queue one batch of code-artifact paths.
///
/// The orchestrator's slot lock keeps batches strictly serialized even when
/// several are queued at once.
pub fn dispatch_batch(
    pool: &DispatchPool,
    orchestrator: Arc<ApplyOrchestrator>,
    paths: Vec<PathBuf>,
) -> Result<()> {
    debug!(files = paths.len(), "queueing code-artifact batch");
    pool.execute("hotswap", move || {
        orchestrator.apply_batch(&paths);
    })?;
    Ok(())
}
