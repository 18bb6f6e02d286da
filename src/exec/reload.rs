// src/exec/reload.rs

//! Single-resource reload dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::errors::Result;
use crate::exec::pool::DispatchPool;
use crate::fs::FileSystem;
use crate::watch::registry::{ReloadRegistry, ReloadTarget};

/// Hand a changed file to its reload target, if it has one.
///
/// Files without a registered target are dropped silently. Returns whether a
/// reload was queued.
pub fn dispatch_reload(
    pool: &DispatchPool,
    registry: &ReloadRegistry,
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
) -> Result<bool> {
    let item_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return Ok(false),
    };
    let Some(target) = registry.lookup_name(item_name)? else {
        debug!(?path, "no reload target registered; ignoring");
        return Ok(false);
    };

    pool.execute("reload", move || run_reload(fs.as_ref(), &target, &path))?;
    Ok(true)
}

/// Read the file and pass it to the handler. Failures are logged, never
/// propagated: the next change to the file is the retry.
pub fn run_reload(fs: &dyn FileSystem, target: &ReloadTarget, path: &Path) {
    let started = Instant::now();
    let result = fs.read(path).and_then(|bytes| target.reload(&bytes));
    match result {
        Ok(()) => info!(
            ?path,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "file reload finished"
        ),
        Err(err) => error!(?path, error = %format!("{err:#}"), "file reload encountered error"),
    }
}
