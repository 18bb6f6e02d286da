// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Errors local to one artifact or one reload target are contained and
//! logged by the component that hits them; only [`HotswapError::WatchFatalError`]
//! ends the watch loop.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HotswapError {
    /// A reload target with the same fingerprint is already registered.
    #[error("file '{path}' is already monitored (fingerprint {fingerprint})")]
    ConflictError { path: PathBuf, fingerprint: String },

    /// Directories cannot be registered as single resources.
    #[error("monitor target is a directory or has no file name: {0:?}")]
    InvalidTargetError(PathBuf),

    #[error("hotswap monitor has been shut down")]
    StoppedError,

    /// Malformed artifact content; aborts the containing batch.
    #[error("artifact '{path}' could not be parsed: {reason}")]
    ParseError { path: String, reason: String },

    /// The batch contradicts itself or the recorded artifact history.
    #[error("batch rejected: {0}")]
    CorruptBatchError(String),

    /// The patcher refused the batch.
    #[error("patch rejected: {0}")]
    PatchError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The watch primitive failed unrecoverably.
    #[error("file watch failed: {0}")]
    WatchFatalError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<notify::Error> for HotswapError {
    fn from(e: notify::Error) -> Self {
        HotswapError::WatchFatalError(e.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HotswapError>;
