// src/config/mod.rs

//! Configuration loading and validation for the hotswap monitor.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate suffixes, durations and pool bounds (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ApplySection, ConfigFile, MonitorSettings, PoolSection, RawConfigFile, ResourceEntry,
    WatchSection,
};
pub use validate::{parse_duration, validate_raw};
