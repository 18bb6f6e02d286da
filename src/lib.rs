// src/lib.rs

pub mod artifact;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod monitor;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::LoggingPatcher;
use crate::monitor::HotswapMonitor;

pub use crate::errors::HotswapError;
pub use crate::monitor::MonitorBuilder;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - a monitor backed by `LoggingPatcher`
/// - one logging reload handler per `[[resource]]`
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = &args.config;
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let settings = cfg.settings().clone();
    std::fs::create_dir_all(&settings.artifact_root).with_context(|| {
        format!(
            "creating artifact root {}",
            settings.artifact_root.display()
        )
    })?;

    let monitor = HotswapMonitor::builder(settings, Arc::new(LoggingPatcher::new()))
        .listener(Arc::new(|| -> Result<()> {
            info!("hotswap committed; listeners notified");
            Ok(())
        }))
        .start()?;

    for path in &cfg.resources {
        let shown = path.clone();
        let fingerprint = monitor.register(
            path,
            Arc::new(move |bytes: &[u8]| -> Result<()> {
                info!(path = ?shown, bytes = bytes.len(), "resource content reloaded");
                Ok(())
            }),
        )?;
        debug!(?path, %fingerprint, "resource registered");
    }

    let outcome = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                eprintln!("failed to listen for Ctrl+C: {e}");
            }
            info!("ctrl-c received; shutting down");
            Ok(())
        }
        res = monitor.wait() => res,
    };

    monitor.shutdown().await;
    if let Err(ref err) = outcome {
        error!(error = %err, "monitor stopped with error");
    }
    outcome.map_err(Into::into)
}

/// Simple dry-run output: print the effective settings.
fn print_dry_run(cfg: &ConfigFile) {
    let s = cfg.settings();
    println!("hotswap dry-run");
    println!("  watch.artifact_root = {}", s.artifact_root.display());
    println!("  watch.artifact_suffix = {}", s.artifact_suffix);
    println!("  watch.container_suffix = {}", s.container_suffix);
    println!("  watch.drain_window = {:?}", s.drain_window);
    println!("  apply.listener_grace = {:?}", s.listener_grace);
    println!("  pool.max_workers = {}", s.max_workers);
    println!();

    println!("resources ({}):", cfg.resources.len());
    for path in &cfg.resources {
        println!("  - {}", path.display());
    }

    debug!("dry-run complete (nothing watched)");
}
