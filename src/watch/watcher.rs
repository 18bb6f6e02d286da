// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::ApplyOrchestrator;
use crate::errors::{HotswapError, Result};
use crate::exec::{dispatch_batch, dispatch_reload, DispatchPool};
use crate::fs::FileSystem;
use crate::watch::classify::{Change, ChangeClassifier};
use crate::watch::registry::ReloadRegistry;
use crate::watch::source::{RawChange, WatchSource};

/// Everything the watch loop hands work to.
#[derive(Clone)]
pub struct WatchContext {
    pub source: Arc<dyn WatchSource>,
    pub classifier: ChangeClassifier,
    pub registry: Arc<ReloadRegistry>,
    pub orchestrator: Arc<ApplyOrchestrator>,
    pub pool: DispatchPool,
    pub fs: Arc<dyn FileSystem>,
}

/// Spawn the watch-drain loop.
///
/// The loop is the single producer of batches. It ends when `shutdown`
/// flips to `true`, when the source closes, or with `WatchFatalError` when
/// the source fails.
pub fn spawn_watch_loop(ctx: WatchContext, mut shutdown: watch::Receiver<bool>) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        info!(root = ?ctx.classifier.artifact_root(), "file monitor start");

        loop {
            let burst = tokio::select! {
                _ = shutdown.changed() => {
                    debug!("shutdown signalled to watch loop");
                    break;
                }
                burst = ctx.source.next_burst() => burst,
            };

            match burst {
                Ok(Some(changes)) => {
                    if let Err(err) = process_burst(&ctx, changes) {
                        if matches!(err, HotswapError::StoppedError) {
                            debug!("monitor stopped while dispatching; leaving watch loop");
                            break;
                        }
                        warn!(error = %err, "failed to dispatch changes");
                    }
                }
                Ok(None) => {
                    debug!("watch source closed");
                    break;
                }
                Err(err) => {
                    error!(error = %err, "file watch failed; watch loop terminated");
                    return Err(match err {
                        HotswapError::WatchFatalError(_) => err,
                        other => HotswapError::WatchFatalError(other.to_string()),
                    });
                }
            }
        }

        info!("file monitor shutdown");
        Ok(())
    })
}

/// Classify one burst, dispatch single-resource reloads as they come and
/// submit the code-artifact paths as one batch.
pub fn process_burst(ctx: &WatchContext, changes: Vec<RawChange>) -> Result<()> {
    let mut pending: Vec<PathBuf> = Vec::new();

    for change in changes {
        debug!(directory = ?change.directory, item = %change.item_name, kind = ?change.kind, "changed");
        match ctx.classifier.classify(&change) {
            Ok(Change::Ignored) => {}
            Ok(Change::SingleResource(path)) => {
                dispatch_reload(&ctx.pool, &ctx.registry, Arc::clone(&ctx.fs), path)?;
            }
            Ok(Change::CodeArtifact(path)) => {
                if !pending.contains(&path) {
                    pending.push(path);
                }
            }
            Err(err) => {
                warn!(path = ?change.path(), error = %err, "could not classify change; skipping");
            }
        }
    }

    if !pending.is_empty() {
        dispatch_batch(&ctx.pool, Arc::clone(&ctx.orchestrator), pending)?;
    }
    Ok(())
}
