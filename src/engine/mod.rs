// src/engine/mod.rs

//! Batch transaction engine.
//!
//! - [`batch`] validates the code-artifact changes of one drain cycle.
//! - [`orchestrator`] applies validated batches one at a time and reconciles
//!   cache, files and listeners.
//! - [`patcher`] is the contract with the code-installing collaborator.
//! - [`listener`] holds post-commit callbacks.

pub mod batch;
pub mod listener;
pub mod orchestrator;
pub mod patcher;

pub use batch::{BatchBuilder, Candidate, ValidatedBatch};
pub use listener::{HotswapListener, ListenerSet};
pub use orchestrator::{ApplyOrchestrator, TxOutcome, TxState};
pub use patcher::{LoggingPatcher, PatchUnit, Patcher};
