// tests/registry.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hotswap::errors::HotswapError;
use hotswap::fs::mock::MockFileSystem;
use hotswap::types::Fingerprint;
use hotswap::watch::{ReloadHandler, ReloadRegistry};
use hotswap_test_utils::ScriptedWatchSource;
use proptest::prelude::*;

type TestResult = Result<(), Box<dyn Error>>;

fn registry() -> (ReloadRegistry, Arc<ScriptedWatchSource>, MockFileSystem) {
    let source = Arc::new(ScriptedWatchSource::new());
    let fs = MockFileSystem::new();
    let registry = ReloadRegistry::new(source.clone(), Arc::new(fs.clone()));
    (registry, source, fs)
}

fn noop_handler() -> Arc<dyn ReloadHandler> {
    Arc::new(|_bytes: &[u8]| -> anyhow::Result<()> { Ok(()) })
}

fn tagged_handler(hits: &Arc<AtomicUsize>) -> Arc<dyn ReloadHandler> {
    let hits = Arc::clone(hits);
    Arc::new(move |_bytes: &[u8]| -> anyhow::Result<()> {
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn colliding_fingerprint_is_a_conflict_and_first_target_stays() -> TestResult {
    let (registry, _source, _fs) = registry();
    let first_hits = Arc::new(AtomicUsize::new(0));
    let second_hits = Arc::new(AtomicUsize::new(0));

    let fingerprint = registry.register("/etc/app/settings.toml", tagged_handler(&first_hits))?;

    // Same file name in another directory: fingerprints are name based.
    let err = registry
        .register("/opt/other/settings.toml", tagged_handler(&second_hits))
        .unwrap_err();
    match err {
        HotswapError::ConflictError { path, fingerprint: fp } => {
            assert_eq!(path, PathBuf::from("/opt/other/settings.toml"));
            assert_eq!(fp, fingerprint.to_string());
        }
        other => panic!("expected ConflictError, got {other:?}"),
    }

    let target = registry.lookup(fingerprint)?.ok_or("first target missing")?;
    assert_eq!(target.path(), Path::new("/etc/app/settings.toml"));
    target.reload(b"x")?;
    assert_eq!(first_hits.load(Ordering::SeqCst), 1);
    assert_eq!(second_hits.load(Ordering::SeqCst), 0);
    assert_eq!(registry.len(), 1);
    Ok(())
}

#[test]
fn directories_are_not_valid_targets() -> TestResult {
    let (registry, _source, fs) = registry();
    fs.add_dir("/etc/app");

    let err = registry.register("/etc/app", noop_handler()).unwrap_err();
    assert!(matches!(err, HotswapError::InvalidTargetError(_)), "got {err:?}");
    assert!(registry.is_empty());
    Ok(())
}

#[test]
fn parent_directories_are_watched_once() -> TestResult {
    let (registry, source, _fs) = registry();
    registry.register("/etc/app/a.toml", noop_handler())?;
    registry.register("/etc/app/b.toml", noop_handler())?;
    registry.register("/var/lib/c.json", noop_handler())?;

    assert_eq!(
        registry.watch_dirs(),
        vec![PathBuf::from("/etc/app"), PathBuf::from("/var/lib")]
    );
    assert_eq!(source.watched_dirs().len(), 2);
    Ok(())
}

#[test]
fn lookup_by_item_name_and_unknown_names() -> TestResult {
    let (registry, _source, _fs) = registry();
    let fp = registry.register("/etc/app/a.toml", noop_handler())?;

    assert_eq!(Fingerprint::of_name("a.toml"), fp);
    assert!(registry.lookup_name("a.toml")?.is_some());
    assert!(registry.lookup_name("b.toml")?.is_none());
    Ok(())
}

#[test]
fn after_unregister_all_everything_is_stopped() -> TestResult {
    let (registry, _source, _fs) = registry();
    let fp = registry.register("/etc/app/a.toml", noop_handler())?;

    registry.unregister_all();

    assert!(matches!(registry.lookup(fp), Err(HotswapError::StoppedError)));
    assert!(matches!(
        registry.register("/etc/app/b.toml", noop_handler()),
        Err(HotswapError::StoppedError)
    ));
    assert!(registry.is_empty());
    Ok(())
}

#[test]
fn concurrent_registrations_of_one_name_admit_exactly_one() -> TestResult {
    let (registry, _source, _fs) = registry();
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry
                    .register(format!("/dir{i}/shared.conf"), noop_handler())
                    .is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(registry.len(), 1);
    Ok(())
}

proptest! {
    #[test]
    fn registration_succeeds_iff_the_name_is_new(
        picks in proptest::collection::vec((0..6usize, 0..4usize), 1..24)
    ) {
        let (registry, _source, _fs) = registry();
        let mut seen = std::collections::HashSet::new();

        for (name_idx, dir_idx) in picks {
            let name = format!("file{name_idx}.conf");
            let path = format!("/d{dir_idx}/{name}");
            let result = registry.register(&path, noop_handler());
            if seen.insert(name) {
                prop_assert!(result.is_ok());
            } else {
                let is_conflict = matches!(result, Err(HotswapError::ConflictError { .. }));
                prop_assert!(is_conflict);
            }
        }
        prop_assert_eq!(registry.len(), seen.len());
    }
}
