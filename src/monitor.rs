// src/monitor.rs

//! `HotswapMonitor`: the owned service tying watch, registry, pool and
//! orchestrator together.
//!
//! Lifecycle:
//! - [`HotswapMonitor::builder`] collects settings and collaborators.
//! - [`MonitorBuilder::start`] watches the artifact root and spawns the
//!   watch-drain loop. It must run inside a Tokio runtime.
//! - [`HotswapMonitor::shutdown`] stops the loop, closes the source, drains
//!   the pool and drops every reload target. Later calls fail with
//!   `StoppedError`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info};

use crate::artifact::{ArtifactDecoder, ClassFileDecoder, FingerprintCache};
use crate::config::MonitorSettings;
use crate::engine::{ApplyOrchestrator, HotswapListener, ListenerSet, Patcher, TxOutcome};
use crate::errors::{HotswapError, Result};
use crate::exec::{dispatch_batch, DispatchPool};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{ArtifactSummary, Fingerprint};
use crate::watch::{
    spawn_watch_loop, ChangeClassifier, NotifyWatchSource, ReloadHandler, ReloadRegistry,
    WatchContext, WatchSource,
};

/// State of the watch-drain loop as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopStatus {
    Running,
    Finished,
    Failed(String),
}

pub struct MonitorBuilder {
    settings: MonitorSettings,
    patcher: Arc<dyn Patcher>,
    listeners: Vec<Arc<dyn HotswapListener>>,
    source: Option<Arc<dyn WatchSource>>,
    fs: Option<Arc<dyn FileSystem>>,
    decoder: Option<Arc<dyn ArtifactDecoder>>,
}

impl MonitorBuilder {
    pub fn listener(mut self, listener: Arc<dyn HotswapListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Replace the `notify`-backed watch source.
    pub fn watch_source(mut self, source: Arc<dyn WatchSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Replace the default [`ClassFileDecoder`].
    pub fn decoder(mut self, decoder: Arc<dyn ArtifactDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Watch the artifact root and spawn the watch loop.
    pub fn start(self) -> Result<HotswapMonitor> {
        let settings = self.settings;
        let source = match self.source {
            Some(source) => source,
            None => Arc::new(NotifyWatchSource::new(settings.drain_window)?) as Arc<dyn WatchSource>,
        };
        let fs = self
            .fs
            .unwrap_or_else(|| Arc::new(RealFileSystem) as Arc<dyn FileSystem>);
        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(ClassFileDecoder) as Arc<dyn ArtifactDecoder>);

        let listeners = ListenerSet::new();
        for listener in self.listeners {
            listeners.add(listener);
        }

        let registry = Arc::new(ReloadRegistry::new(Arc::clone(&source), Arc::clone(&fs)));
        registry.watch_directory(&settings.artifact_root)?;

        let pool = DispatchPool::new("file-reload", settings.max_workers)?;
        let cache = Arc::new(FingerprintCache::new());
        let orchestrator = Arc::new(ApplyOrchestrator::new(
            settings.clone(),
            Arc::clone(&fs),
            cache,
            decoder,
            self.patcher,
            listeners,
        ));

        let ctx = WatchContext {
            source: Arc::clone(&source),
            classifier: ChangeClassifier::new(&settings.artifact_root, Arc::clone(&fs)),
            registry: Arc::clone(&registry),
            orchestrator: Arc::clone(&orchestrator),
            pool: pool.clone(),
            fs,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(LoopStatus::Running);
        let handle = spawn_watch_loop(ctx, shutdown_rx);
        tokio::spawn(async move {
            let status = match handle.await {
                Ok(Ok(())) => LoopStatus::Finished,
                Ok(Err(err)) => LoopStatus::Failed(err.to_string()),
                Err(join_err) => LoopStatus::Failed(format!("watch loop panicked: {join_err}")),
            };
            let _ = status_tx.send(status);
        });

        info!(
            root = ?settings.artifact_root,
            workers = pool.workers(),
            grace_ms = settings.listener_grace.as_millis() as u64,
            "hotswap monitor started"
        );

        Ok(HotswapMonitor {
            settings,
            source,
            registry,
            orchestrator,
            pool,
            stopped: AtomicBool::new(false),
            shutdown_tx,
            status_rx,
        })
    }
}

pub struct HotswapMonitor {
    settings: MonitorSettings,
    source: Arc<dyn WatchSource>,
    registry: Arc<ReloadRegistry>,
    orchestrator: Arc<ApplyOrchestrator>,
    pool: DispatchPool,
    stopped: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<LoopStatus>,
}

impl std::fmt::Debug for HotswapMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotswapMonitor")
            .field("root", &self.settings.artifact_root)
            .field("stopped", &self.is_stopped())
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl HotswapMonitor {
    pub fn builder(settings: MonitorSettings, patcher: Arc<dyn Patcher>) -> MonitorBuilder {
        MonitorBuilder {
            settings,
            patcher,
            listeners: Vec::new(),
            source: None,
            fs: None,
            decoder: None,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(HotswapError::StoppedError);
        }
        Ok(())
    }

    /// Register a single resource. Its parent directory joins the watch set.
    pub fn register(&self, path: impl AsRef<Path>, handler: Arc<dyn ReloadHandler>) -> Result<Fingerprint> {
        self.ensure_running()?;
        self.registry.register(path, handler)
    }

    pub fn registry(&self) -> &Arc<ReloadRegistry> {
        &self.registry
    }

    /// Queue a batch of code-artifact paths, bypassing the watcher.
    pub fn submit_batch(&self, paths: Vec<PathBuf>) -> Result<()> {
        self.ensure_running()?;
        dispatch_batch(&self.pool, Arc::clone(&self.orchestrator), paths)
    }

    /// Like [`submit_batch`](Self::submit_batch) but waits for the outcome.
    pub async fn apply(&self, paths: Vec<PathBuf>) -> Result<TxOutcome> {
        self.ensure_running()?;
        let (tx, rx) = oneshot::channel();
        let orchestrator = Arc::clone(&self.orchestrator);
        self.pool.execute("hotswap", move || {
            let _ = tx.send(orchestrator.apply_batch(&paths));
        })?;
        rx.await
            .map_err(|_| HotswapError::PatchError("batch job ended without an outcome".to_string()))
    }

    /// Every artifact summary currently cached, sorted by name.
    pub fn status(&self) -> Vec<ArtifactSummary> {
        self.orchestrator.cache().snapshot()
    }

    pub fn add_listener(&self, listener: Arc<dyn HotswapListener>) {
        self.orchestrator.listeners().add(listener);
    }

    pub fn orchestrator(&self) -> &Arc<ApplyOrchestrator> {
        &self.orchestrator
    }

    /// Wait until the watch loop ends. Returns `WatchFatalError` if the
    /// watch primitive failed.
    pub async fn wait(&self) -> Result<()> {
        let mut status_rx = self.status_rx.clone();
        let status = match status_rx.wait_for(|s| *s != LoopStatus::Running).await {
            Ok(status) => status.clone(),
            Err(_) => LoopStatus::Finished,
        };
        match status {
            LoopStatus::Failed(reason) => Err(HotswapError::WatchFatalError(reason)),
            _ => Ok(()),
        }
    }

    /// Stop the monitor. In-flight reloads and batches finish first.
    ///
    /// Idempotent; only the first call does any work.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("hotswap monitor already stopped");
            return;
        }
        info!("hotswap monitor shutting down");

        let _ = self.shutdown_tx.send(true);
        self.source.close();
        if let Err(err) = self.wait().await {
            error!(error = %err, "watch loop had already failed");
        }

        self.pool.shutdown().await;
        self.registry.unregister_all();
        info!("hotswap monitor stopped");
    }
}
