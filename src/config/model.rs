// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::validate::{parse_duration, validate_raw};
use crate::errors::HotswapError;
use crate::exec::effective_workers;

pub const DEFAULT_ARTIFACT_ROOT: &str = "hotswap/classes";
pub const DEFAULT_ARTIFACT_SUFFIX: &str = ".class";
pub const DEFAULT_CONTAINER_SUFFIX: &str = ".zip";
pub const DEFAULT_DRAIN_WINDOW: &str = "50ms";
pub const DEFAULT_LISTENER_GRACE: &str = "5s";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// artifact_root = "hotswap/classes"
/// artifact_suffix = ".class"
/// container_suffix = ".zip"
/// drain_window = "50ms"
///
/// [apply]
/// listener_grace = "5s"
///
/// [pool]
/// max_workers = 4
///
/// [[resource]]
/// path = "conf/app.toml"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub apply: ApplySection,

    #[serde(default)]
    pub pool: PoolSection,

    /// Files the `hotswap` binary reloads with a logging handler.
    #[serde(default)]
    pub resource: Vec<ResourceEntry>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Directory whose direct children are code artifacts or containers.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,

    #[serde(default = "default_artifact_suffix")]
    pub artifact_suffix: String,

    #[serde(default = "default_container_suffix")]
    pub container_suffix: String,

    /// How long to keep collecting events after the first one of a burst.
    #[serde(default = "default_drain_window")]
    pub drain_window: String,
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_ROOT)
}

fn default_artifact_suffix() -> String {
    DEFAULT_ARTIFACT_SUFFIX.to_string()
}

fn default_container_suffix() -> String {
    DEFAULT_CONTAINER_SUFFIX.to_string()
}

fn default_drain_window() -> String {
    DEFAULT_DRAIN_WINDOW.to_string()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            artifact_root: default_artifact_root(),
            artifact_suffix: default_artifact_suffix(),
            container_suffix: default_container_suffix(),
            drain_window: default_drain_window(),
        }
    }
}

/// `[apply]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplySection {
    /// Delay between a commit and listener notification, e.g. `"5s"`.
    #[serde(default = "default_listener_grace")]
    pub listener_grace: String,
}

fn default_listener_grace() -> String {
    DEFAULT_LISTENER_GRACE.to_string()
}

impl Default for ApplySection {
    fn default() -> Self {
        Self {
            listener_grace: default_listener_grace(),
        }
    }
}

/// `[pool]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PoolSection {
    /// Upper bound on concurrent workers. Defaults to available parallelism
    /// and is clamped to it.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

/// `[[resource]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    pub path: PathBuf,
}

/// Everything the monitor core needs, with durations parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub artifact_root: PathBuf,
    pub artifact_suffix: String,
    pub container_suffix: String,
    pub drain_window: Duration,
    pub listener_grace: Duration,
    pub max_workers: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            artifact_root: default_artifact_root(),
            artifact_suffix: default_artifact_suffix(),
            container_suffix: default_container_suffix(),
            drain_window: Duration::from_millis(50),
            listener_grace: Duration::from_secs(5),
            max_workers: effective_workers(None),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: MonitorSettings,
    pub resources: Vec<PathBuf>,
}

impl ConfigFile {
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = HotswapError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        validate_raw(&raw).map_err(|e| HotswapError::ConfigError(format!("{e:#}")))?;

        let drain_window = parse_duration(&raw.watch.drain_window)
            .map_err(|e| HotswapError::ConfigError(format!("[watch].drain_window: {e}")))?;
        let listener_grace = parse_duration(&raw.apply.listener_grace)
            .map_err(|e| HotswapError::ConfigError(format!("[apply].listener_grace: {e}")))?;

        Ok(ConfigFile {
            settings: MonitorSettings {
                artifact_root: raw.watch.artifact_root,
                artifact_suffix: raw.watch.artifact_suffix,
                container_suffix: raw.watch.container_suffix,
                drain_window,
                listener_grace,
                max_workers: effective_workers(raw.pool.max_workers),
            },
            resources: raw.resource.into_iter().map(|r| r.path).collect(),
        })
    }
}
