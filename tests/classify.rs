// tests/classify.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hotswap::fs::mock::MockFileSystem;
use hotswap::watch::{should_ignore, Change, ChangeClassifier, ChangeKind, RawChange};

type TestResult = Result<(), Box<dyn Error>>;

const ROOT: &str = "/app/hotswap/classes";

fn classifier() -> (ChangeClassifier, MockFileSystem) {
    let fs = MockFileSystem::new();
    fs.add_dir(ROOT);
    (ChangeClassifier::new(Path::new(ROOT), Arc::new(fs.clone())), fs)
}

#[test]
fn files_in_the_artifact_root_are_code_artifacts() -> TestResult {
    let (classifier, fs) = classifier();
    fs.add_file("/app/hotswap/classes/A.class", b"x".to_vec());

    let change = RawChange::new(ROOT, "A.class", ChangeKind::Modified);
    assert_eq!(
        classifier.classify(&change)?,
        Change::CodeArtifact(PathBuf::from("/app/hotswap/classes/A.class"))
    );
    Ok(())
}

#[test]
fn files_elsewhere_are_single_resources() -> TestResult {
    let (classifier, fs) = classifier();
    fs.add_file("/app/conf/app.toml", b"x".to_vec());
    fs.add_file("/app/hotswap/classes/sub/A.class", b"x".to_vec());

    let change = RawChange::new("/app/conf", "app.toml", ChangeKind::Created);
    assert_eq!(
        classifier.classify(&change)?,
        Change::SingleResource(PathBuf::from("/app/conf/app.toml"))
    );

    // Only direct children of the root are artifacts.
    let nested = RawChange::new("/app/hotswap/classes/sub", "A.class", ChangeKind::Modified);
    assert!(matches!(classifier.classify(&nested)?, Change::SingleResource(_)));
    Ok(())
}

#[test]
fn hidden_directories_unreadable_and_removed_entries_are_ignored() -> TestResult {
    let (classifier, fs) = classifier();
    fs.add_file("/app/conf/.app.toml.swp", b"x".to_vec());
    fs.add_dir("/app/conf/nested");
    fs.add_file("/app/conf/secret.toml", b"x".to_vec());
    fs.set_unreadable("/app/conf/secret.toml");
    fs.add_file("/app/conf/app.toml", b"x".to_vec());

    for change in [
        RawChange::new("/app/conf", ".app.toml.swp", ChangeKind::Modified),
        RawChange::new("/app/conf", "nested", ChangeKind::Created),
        RawChange::new("/app/conf", "secret.toml", ChangeKind::Modified),
        RawChange::new("/app/conf", "missing.toml", ChangeKind::Modified),
        RawChange::new("/app/conf", "app.toml", ChangeKind::Removed),
        RawChange::new("/app/conf", "app.toml", ChangeKind::Other),
    ] {
        assert_eq!(classifier.classify(&change)?, Change::Ignored, "{change:?}");
    }
    Ok(())
}

#[test]
fn failing_probe_is_an_error_for_that_entry() {
    let (classifier, fs) = classifier();
    fs.add_file("/app/conf/app.toml", b"x".to_vec());
    fs.set_probe_failure("/app/conf/app.toml");

    let change = RawChange::new("/app/conf", "app.toml", ChangeKind::Modified);
    assert!(classifier.classify(&change).is_err());
    assert!(should_ignore(&fs, &change.path()).is_err());
}
