#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hotswap::artifact::{ClassFileDecoder, FingerprintCache};
use hotswap::config::MonitorSettings;
use hotswap::engine::{ApplyOrchestrator, ListenerSet};
use hotswap::fs::mock::MockFileSystem;
use hotswap_test_utils::builders::SettingsBuilder;
use hotswap_test_utils::FakePatcher;

pub use hotswap_test_utils::{init_tracing, with_timeout};

pub const ROOT: &str = "/srv/app/hotswap/classes";

/// Orchestrator over an in-memory filesystem and a fake patcher.
pub struct Harness {
    pub fs: MockFileSystem,
    pub patcher: Arc<FakePatcher>,
    pub cache: Arc<FingerprintCache>,
    pub listeners: ListenerSet,
    pub orchestrator: ApplyOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_patcher(FakePatcher::new())
    }

    pub fn with_patcher(patcher: FakePatcher) -> Self {
        Self::with(SettingsBuilder::new(ROOT).build(), patcher)
    }

    pub fn with(settings: MonitorSettings, patcher: FakePatcher) -> Self {
        init_tracing();
        let fs = MockFileSystem::new();
        fs.add_dir(ROOT);
        let patcher = Arc::new(patcher);
        let cache = Arc::new(FingerprintCache::new());
        let listeners = ListenerSet::new();
        let orchestrator = ApplyOrchestrator::new(
            settings,
            Arc::new(fs.clone()),
            Arc::clone(&cache),
            Arc::new(ClassFileDecoder),
            patcher.clone(),
            listeners.clone(),
        );
        Self {
            fs,
            patcher,
            cache,
            listeners,
            orchestrator,
        }
    }

    /// Drop a file into the artifact root.
    pub fn put(&self, file: &str, bytes: Vec<u8>, modified_ms: u64) -> PathBuf {
        let path = artifact_path(file);
        self.fs.add_file_at(&path, bytes, modified_ms);
        path
    }
}

pub fn artifact_path(file: &str) -> PathBuf {
    Path::new(ROOT).join(file)
}
