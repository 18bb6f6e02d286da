// src/engine/patcher.rs

//! Contract with the component that actually installs code in the running
//! process.
//!
//! The orchestrator never knows *how* code is introduced or redefined; it only
//! hands over validated lists and reacts to success or failure.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use tracing::info;

/// A validated artifact ready to be handed to the patcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchUnit {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub trait Patcher: Send + Sync {
    /// Make brand-new code available to the running process.
    fn introduce_new(&self, units: &[PatchUnit]) -> Result<()>;

    /// Replace already-loaded code. Must apply every unit or none.
    fn redefine_existing(&self, units: &[PatchUnit]) -> Result<()>;

    /// Whether `name` is currently loaded, independent of anything this crate
    /// has applied.
    fn is_loaded(&self, name: &str) -> bool;
}

/// Patcher that applies nothing and logs what it was given.
///
/// Names it is handed become "loaded", so later deliveries of the same name
/// are treated as redefinitions. Used by the `hotswap` binary to exercise a
/// delivery pipeline end to end without a host runtime.
#[derive(Debug, Default)]
pub struct LoggingPatcher {
    loaded: Mutex<BTreeSet<String>>,
}

impl LoggingPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn record(&self, units: &[PatchUnit]) {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        for unit in units {
            loaded.insert(unit.name.clone());
        }
    }
}

impl Patcher for LoggingPatcher {
    fn introduce_new(&self, units: &[PatchUnit]) -> Result<()> {
        for unit in units {
            info!(name = %unit.name, bytes = unit.bytes.len(), "would introduce new artifact");
        }
        self.record(units);
        Ok(())
    }

    fn redefine_existing(&self, units: &[PatchUnit]) -> Result<()> {
        for unit in units {
            info!(name = %unit.name, bytes = unit.bytes.len(), "would redefine artifact");
        }
        self.record(units);
        Ok(())
    }

    fn is_loaded(&self, name: &str) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}
