// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - The watch primitive seam and its `notify` implementation ([`source`]).
//! - Turning raw events into typed changes ([`classify`]).
//! - The registry of single-resource reload targets ([`registry`]).
//! - The watch-drain loop feeding the dispatch pool ([`watcher`]).
//!
//! It does **not** validate or apply artifacts; code-artifact paths are
//! handed to the engine as one batch per drain cycle.

pub mod classify;
pub mod registry;
pub mod source;
pub mod watcher;

pub use classify::{should_ignore, Change, ChangeClassifier};
pub use registry::{ReloadHandler, ReloadRegistry, ReloadTarget};
pub use source::{BurstFuture, ChangeKind, NotifyWatchSource, RawChange, WatchSource};
pub use watcher::{process_burst, spawn_watch_loop, WatchContext};
