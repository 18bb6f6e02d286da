// tests/batch_transaction.rs

mod common;
use crate::common::{artifact_path, Harness};

use std::error::Error;
use std::path::{Path, MAIN_SEPARATOR};

use hotswap::engine::{TxOutcome, TxState};
use hotswap::errors::HotswapError;
use hotswap_test_utils::builders::{
    class_file, class_file_variant, malformed_class_file, zip_bytes, ZipMember,
};
use hotswap_test_utils::{FakePatcher, PatchCall};

type TestResult = Result<(), Box<dyn Error>>;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn unchanged_artifact_is_a_no_op_the_second_time() -> TestResult {
    let h = Harness::new();
    let path = h.put("A.class", class_file("com.example.A"), 1_000);

    let first = h.orchestrator.apply_batch(&[path.clone()]);
    assert!(matches!(first, TxOutcome::Committed { introduced: 1, redefined: 0 }));
    assert_eq!(h.patcher.call_count(), 1);
    let cached = h.cache.snapshot();

    // Same name, same modification time.
    h.put("A.class", class_file("com.example.A"), 1_000);
    let second = h.orchestrator.apply_batch(&[path.clone()]);

    assert!(matches!(second, TxOutcome::NoChange), "got {second:?}");
    assert_eq!(h.patcher.call_count(), 1, "patcher must not be called again");
    assert_eq!(h.cache.snapshot(), cached, "cache must not change");
    assert!(h.fs.exists(&path), "a no-op batch touches no files");
    Ok(())
}

#[test]
fn malformed_artifact_aborts_the_whole_batch() -> TestResult {
    let h = Harness::new();
    let one = h.put("One.class", class_file("com.example.One"), 1_000);
    let two = h.put("Two.class", malformed_class_file(), 1_000);
    let three = h.put("Three.class", class_file("com.example.Three"), 1_000);

    let outcome = h
        .orchestrator
        .apply_batch(&[one.clone(), two.clone(), three.clone()]);

    match outcome {
        TxOutcome::Aborted(HotswapError::ParseError { path, .. }) => {
            assert!(path.ends_with("Two.class"), "unexpected path {path}");
        }
        other => panic!("expected ParseError abort, got {other:?}"),
    }
    assert_eq!(h.patcher.call_count(), 0, "patcher must never be called");
    for path in [&one, &two, &three] {
        assert!(h.fs.exists(path), "{path:?} must be kept");
    }
    assert!(h.cache.is_empty(), "cache must be unchanged");
    assert_eq!(h.orchestrator.state(), TxState::Idle);
    Ok(())
}

#[test]
fn valid_batch_commits_new_and_updated_artifacts() -> TestResult {
    let h = Harness::with_patcher(FakePatcher::new().with_loaded(&["com.example.Existing"]));
    let first = h.put("First.class", class_file("com.example.First"), 1_000);
    let second = h.put("Second.class", class_file("com.example.Second"), 1_000);
    let existing = h.put("Existing.class", class_file("com.example.Existing"), 1_000);

    let outcome = h
        .orchestrator
        .apply_batch(&[first.clone(), second.clone(), existing.clone()]);

    assert!(
        matches!(outcome, TxOutcome::Committed { introduced: 2, redefined: 1 }),
        "got {outcome:?}"
    );
    assert_eq!(
        h.patcher.calls(),
        vec![
            PatchCall::Introduce(names(&["com.example.First", "com.example.Second"])),
            PatchCall::Redefine(names(&["com.example.Existing"])),
        ]
    );

    let status: Vec<String> = h.cache.snapshot().into_iter().map(|s| s.name).collect();
    assert_eq!(
        status,
        names(&["com.example.Existing", "com.example.First", "com.example.Second"])
    );
    for path in [&first, &second, &existing] {
        assert!(!h.fs.exists(path), "{path:?} should be deleted on commit");
    }
    assert_eq!(h.orchestrator.state(), TxState::Idle);
    Ok(())
}

#[test]
fn identical_content_with_new_timestamp_is_skipped() -> TestResult {
    let h = Harness::new();
    let path = h.put("A.class", class_file("com.example.A"), 1_000);
    assert!(h.orchestrator.apply_batch(&[path.clone()]).is_committed());

    h.put("A.class", class_file("com.example.A"), 2_000);
    let outcome = h.orchestrator.apply_batch(&[path.clone()]);
    assert!(matches!(outcome, TxOutcome::NoChange), "got {outcome:?}");
    assert_eq!(h.patcher.call_count(), 1);

    h.put("A.class", class_file_variant("com.example.A", 1), 3_000);
    let outcome = h.orchestrator.apply_batch(&[path.clone()]);
    assert!(
        matches!(outcome, TxOutcome::Committed { introduced: 0, redefined: 1 }),
        "previously applied artifact is an update, got {outcome:?}"
    );
    let summary = h.cache.get("com.example.A").ok_or("missing summary")?;
    assert_eq!(summary.last_modified_ms, 3_000);
    Ok(())
}

#[test]
fn skipped_files_are_consumed_when_the_batch_commits() -> TestResult {
    let h = Harness::new();
    let a = h.put("A.class", class_file("com.example.A"), 1_000);
    assert!(h.orchestrator.apply_batch(&[a.clone()]).is_committed());

    h.put("A.class", class_file("com.example.A"), 1_000);
    let b = h.put("B.class", class_file("com.example.B"), 1_000);
    let outcome = h.orchestrator.apply_batch(&[a.clone(), b.clone()]);

    assert!(matches!(outcome, TxOutcome::Committed { introduced: 1, redefined: 0 }));
    assert!(!h.fs.exists(&a));
    assert!(!h.fs.exists(&b));
    Ok(())
}

#[test]
fn duplicate_name_in_one_batch() -> TestResult {
    let h = Harness::new();
    let a = h.put("A.class", class_file("com.example.A"), 1_000);
    let copy = h.put("ACopy.class", class_file("com.example.A"), 1_000);

    let outcome = h.orchestrator.apply_batch(&[a.clone(), copy.clone()]);
    assert!(matches!(outcome, TxOutcome::Committed { introduced: 1, redefined: 0 }));
    assert_eq!(
        h.patcher.calls(),
        vec![PatchCall::Introduce(names(&["com.example.A"]))]
    );

    let h = Harness::new();
    let a = h.put("A.class", class_file_variant("com.example.A", 1), 1_000);
    let other = h.put("AOther.class", class_file_variant("com.example.A", 2), 1_000);
    let outcome = h.orchestrator.apply_batch(&[a.clone(), other.clone()]);
    assert!(
        matches!(outcome, TxOutcome::Aborted(HotswapError::CorruptBatchError(_))),
        "got {outcome:?}"
    );
    assert_eq!(h.patcher.call_count(), 0);
    assert!(h.fs.exists(&a) && h.fs.exists(&other));
    Ok(())
}

#[test]
fn source_delivering_a_different_name_is_rejected() -> TestResult {
    let h = Harness::new();
    let path = h.put("Foo.class", class_file("com.example.Foo"), 1_000);
    assert!(h.orchestrator.apply_batch(&[path.clone()]).is_committed());

    h.put("Foo.class", class_file("com.example.Bar"), 2_000);
    let outcome = h.orchestrator.apply_batch(&[path.clone()]);

    assert!(
        matches!(outcome, TxOutcome::Aborted(HotswapError::CorruptBatchError(_))),
        "got {outcome:?}"
    );
    assert_eq!(h.cache.len(), 1);
    assert!(h.cache.get("com.example.Bar").is_none());
    assert!(h.fs.exists(&path));
    Ok(())
}

#[test]
fn patcher_failure_keeps_files_and_cache_and_allows_retry() -> TestResult {
    let h = Harness::new();
    let path = h.put("A.class", class_file("com.example.A"), 1_000);

    h.patcher.fail_introduce(true);
    let outcome = h.orchestrator.apply_batch(&[path.clone()]);
    assert!(
        matches!(outcome, TxOutcome::Aborted(HotswapError::PatchError(_))),
        "got {outcome:?}"
    );
    assert!(h.fs.exists(&path));
    assert!(h.cache.is_empty());

    h.patcher.fail_introduce(false);
    let retry = h.orchestrator.apply_batch(&[path.clone()]);
    assert!(retry.is_committed(), "an aborted attempt must not poison retries: {retry:?}");
    assert!(!h.fs.exists(&path));
    Ok(())
}

#[test]
fn redefine_is_one_call_and_its_failure_aborts() -> TestResult {
    let h = Harness::with_patcher(
        FakePatcher::new().with_loaded(&["com.example.A", "com.example.B"]),
    );
    let a = h.put("A.class", class_file("com.example.A"), 1_000);
    let b = h.put("B.class", class_file("com.example.B"), 1_000);

    h.patcher.fail_redefine(true);
    let outcome = h.orchestrator.apply_batch(&[a.clone(), b.clone()]);

    assert!(outcome.is_aborted());
    assert_eq!(
        h.patcher.calls(),
        vec![PatchCall::Redefine(names(&["com.example.A", "com.example.B"]))]
    );
    assert!(h.cache.is_empty());
    assert!(h.fs.exists(&a) && h.fs.exists(&b));
    Ok(())
}

#[test]
fn delete_failure_aborts_without_touching_the_cache() -> TestResult {
    let h = Harness::new();
    let path = h.put("A.class", class_file("com.example.A"), 1_000);
    h.fs.set_undeletable(&path);

    let outcome = h.orchestrator.apply_batch(&[path.clone()]);

    assert!(outcome.is_aborted(), "got {outcome:?}");
    assert!(h.cache.is_empty());
    assert!(h.fs.exists(&path));
    Ok(())
}

#[test]
fn container_members_apply_as_one_transaction() -> TestResult {
    let h = Harness::new();
    let bundle = zip_bytes(&[
        ZipMember::dir("com/"),
        ZipMember::file("com/example/A.class", class_file("com.example.A")),
        ZipMember::file("com/example/B.class", class_file("com.example.B")),
        ZipMember::file("README.txt", b"not an artifact".to_vec()),
    ]);
    let path = h.put("bundle.zip", bundle, 5_000);

    let outcome = h.orchestrator.apply_batch(&[path.clone()]);

    assert!(
        matches!(outcome, TxOutcome::Committed { introduced: 2, redefined: 0 }),
        "got {outcome:?}"
    );
    assert_eq!(
        h.patcher.calls(),
        vec![PatchCall::Introduce(names(&["com.example.A", "com.example.B"]))]
    );
    assert!(!h.fs.exists(&path));

    let a = h.cache.get("com.example.A").ok_or("missing summary")?;
    let expected_suffix = format!("bundle.zip!{MAIN_SEPARATOR}com/example/A.class");
    assert!(a.source.ends_with(&expected_suffix), "source was {}", a.source);
    assert_eq!(a.last_modified_ms, 1_704_164_646_000);
    Ok(())
}

#[test]
fn malformed_container_member_aborts_the_container() -> TestResult {
    let h = Harness::new();
    let bundle = zip_bytes(&[
        ZipMember::file("A.class", class_file("com.example.A")),
        ZipMember::file("Broken.class", malformed_class_file()),
    ]);
    let path = h.put("bundle.zip", bundle, 5_000);

    let outcome = h.orchestrator.apply_batch(&[path.clone()]);

    assert!(matches!(outcome, TxOutcome::Aborted(HotswapError::ParseError { .. })));
    assert_eq!(h.patcher.call_count(), 0);
    assert!(h.fs.exists(&path));
    Ok(())
}

#[test]
fn non_artifacts_hidden_and_vanished_files_are_skipped() -> TestResult {
    let h = Harness::new();
    let notes = h.put("notes.txt", b"hello".to_vec(), 1_000);
    let hidden = h.put(".A.class", class_file("com.example.A"), 1_000);
    let vanished = artifact_path("Gone.class");

    let outcome = h
        .orchestrator
        .apply_batch(&[notes.clone(), hidden.clone(), vanished]);

    assert!(matches!(outcome, TxOutcome::NoChange), "got {outcome:?}");
    assert!(h.fs.exists(&notes));
    assert!(h.fs.exists(&hidden));
    assert_eq!(h.patcher.call_count(), 0);

    assert!(matches!(h.orchestrator.apply_batch(&[]), TxOutcome::NoChange));
    Ok(())
}

#[test]
fn files_outside_the_artifact_root_are_neither_applied_nor_deleted() -> TestResult {
    let h = Harness::new();
    let stray = Path::new("/srv/app/lib/Stray.class").to_path_buf();
    let nested = artifact_path("sub/Nested.class");
    h.fs.add_file_at(&stray, class_file("com.example.Stray"), 1_000);
    h.fs.add_file_at(&nested, class_file("com.example.Nested"), 1_000);
    let inside = h.put("A.class", class_file("com.example.A"), 1_000);

    let outcome = h
        .orchestrator
        .apply_batch(&[stray.clone(), nested.clone(), inside.clone()]);

    assert!(outcome.is_committed(), "got {outcome:?}");
    assert_eq!(
        h.patcher.calls(),
        vec![PatchCall::Introduce(vec!["com.example.A".to_string()])]
    );
    assert!(h.fs.exists(&stray));
    assert!(h.fs.exists(&nested));
    assert!(!h.fs.exists(&inside));
    Ok(())
}
