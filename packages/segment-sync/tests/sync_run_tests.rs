//! End-to-end tests for a sync run.
//!
//! These drive `run_once` with a mock membership source, a recording emitter
//! and either the in-memory or the file-backed snapshot store, and check:
//! 1. Which events are emitted for each kind of membership change
//! 2. What ends up in the snapshot
//! 3. That failures are isolated or abort the run as appropriate

use std::collections::HashSet;

use segment_sync::testing::{MemorySnapshotStore, MockMembershipSource, RecordingEmitter};
use segment_sync::{
    run_once, EventKind, FileSnapshotStore, MembershipSet, ProfileId, Reconciler, RunOptions,
    SegmentConfig, Snapshot, SnapshotStore, SyncError,
};
use tempfile::TempDir;

fn set(ids: &[&str]) -> MembershipSet {
    ids.iter().map(|id| ProfileId::from(*id)).collect()
}

fn segment() -> SegmentConfig {
    SegmentConfig::new("Xy12", "Engaged")
}

fn ids_of(events: &[segment_sync::LifecycleEvent], kind: EventKind) -> HashSet<String> {
    events
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.profile_id.to_string())
        .collect()
}

fn hs(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Run once against an in-memory snapshot seeded with `cached`.
async fn run_with(
    cached: &[&str],
    source: MockMembershipSource,
    emitter: RecordingEmitter,
) -> (
    segment_sync::ReconcileReport,
    RecordingEmitter,
    MemorySnapshotStore,
) {
    let store = if cached.is_empty() {
        MemorySnapshotStore::new()
    } else {
        MemorySnapshotStore::with_members(cached)
    };
    let reconciler = Reconciler::new(emitter.clone(), store.clone());

    let report = run_once(&source, &reconciler, &segment(), RunOptions::default())
        .await
        .unwrap();

    (report, emitter, store)
}

#[tokio::test]
async fn test_no_change_run_emits_nothing() {
    let source = MockMembershipSource::new().with_page(&["A", "B"]);

    let (report, emitter, store) = run_with(&["A", "B"], source, RecordingEmitter::new()).await;

    assert!(emitter.attempts().is_empty());
    assert_eq!(report.joined, 0);
    assert_eq!(report.left, 0);
    assert_eq!(store.snapshot().members, set(&["A", "B"]));
    assert!(store.snapshot().last_updated > Some(MemorySnapshotStore::seeded_at()));
}

#[tokio::test]
async fn test_join_only() {
    let source = MockMembershipSource::new().with_page(&["A", "B", "C"]);

    let (report, emitter, store) = run_with(&["A", "B"], source, RecordingEmitter::new()).await;

    let events = emitter.events();
    assert_eq!(events.len(), 1);
    assert_eq!(ids_of(&events, EventKind::Joined), hs(&["C"]));
    assert!(ids_of(&events, EventKind::Left).is_empty());
    assert_eq!((report.joined, report.left), (1, 0));
    assert_eq!(store.snapshot().members, set(&["A", "B", "C"]));
}

#[tokio::test]
async fn test_leave_only() {
    let source = MockMembershipSource::new().with_page(&["A", "B"]);

    let (report, emitter, store) =
        run_with(&["A", "B", "C"], source, RecordingEmitter::new()).await;

    let events = emitter.events();
    assert_eq!(events.len(), 1);
    assert_eq!(ids_of(&events, EventKind::Left), hs(&["C"]));
    assert!(ids_of(&events, EventKind::Joined).is_empty());
    assert_eq!((report.joined, report.left), (0, 1));
    assert_eq!(store.snapshot().members, set(&["A", "B"]));
}

#[tokio::test]
async fn test_mixed_diff() {
    let source = MockMembershipSource::new().with_page(&["B", "C", "D"]);

    let (report, emitter, store) =
        run_with(&["A", "B", "C"], source, RecordingEmitter::new()).await;

    let events = emitter.events();
    assert_eq!(events.len(), 2);
    assert_eq!(ids_of(&events, EventKind::Joined), hs(&["D"]));
    assert_eq!(ids_of(&events, EventKind::Left), hs(&["A"]));
    assert_eq!((report.joined, report.left), (1, 1));
    assert_eq!(store.snapshot().members, set(&["B", "C", "D"]));
}

#[tokio::test]
async fn test_empty_cache_bootstrap() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engaged.json");
    let emitter = RecordingEmitter::new();
    let reconciler = Reconciler::new(emitter.clone(), FileSnapshotStore::new(&path));
    let source = MockMembershipSource::new().with_page(&["A", "B"]);

    let report = run_once(&source, &reconciler, &segment(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(ids_of(&emitter.events(), EventKind::Joined), hs(&["A", "B"]));
    assert_eq!(report.left, 0);
    assert!(report.persisted);
    let saved = FileSnapshotStore::new(&path).load().await;
    assert_eq!(saved.members, set(&["A", "B"]));
    assert!(saved.last_updated.is_some());
}

#[tokio::test]
async fn test_corrupt_cache_reannounces_everyone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engaged.json");
    std::fs::write(&path, "not json at all").unwrap();
    let emitter = RecordingEmitter::new();
    let reconciler = Reconciler::new(emitter.clone(), FileSnapshotStore::new(&path));
    let source = MockMembershipSource::new().with_page(&["A", "B", "C"]);

    let report = run_once(&source, &reconciler, &segment(), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.joined, 3);
    assert_eq!(emitter.events().len(), 3);
    assert_eq!(
        FileSnapshotStore::new(&path).load().await.members,
        set(&["A", "B", "C"])
    );
}

#[tokio::test]
async fn test_partial_fetch_failure_leaves_snapshot_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engaged.json");
    let store = FileSnapshotStore::new(&path);
    store
        .save(&Snapshot::new(
            set(&["A", "B", "C", "D"]),
            MemorySnapshotStore::seeded_at(),
        ))
        .await
        .unwrap();
    let before = std::fs::read(&path).unwrap();

    let emitter = RecordingEmitter::new();
    let reconciler = Reconciler::new(emitter.clone(), store);
    let source = MockMembershipSource::new()
        .with_page(&["A", "B"])
        .with_failure(500, r#"{"errors":[{"detail":"boom"}]}"#)
        .with_page(&["C", "D"]);

    let err = run_once(&source, &reconciler, &segment(), RunOptions::default())
        .await
        .unwrap_err();

    match err {
        SyncError::Fetch(fetch) => {
            assert_eq!(fetch.status(), Some(500));
            assert!(fetch.to_string().contains("boom"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert!(emitter.attempts().is_empty());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_emission_failure_is_isolated() {
    let source = MockMembershipSource::new().with_page(&["A", "B", "C"]);
    let emitter = RecordingEmitter::new().failing_for(&["B"]);

    let (report, emitter, store) = run_with(&[], source, emitter).await;

    assert_eq!(ids_of(&emitter.attempts(), EventKind::Joined), hs(&["A", "B", "C"]));
    assert_eq!(ids_of(&emitter.events(), EventKind::Joined), hs(&["A", "C"]));
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.emission_failures[0].profile_id, ProfileId::from("B"));
    assert!(report.emission_failures[0].reason.contains("500"));
    assert!(report.persisted);
    assert_eq!(store.snapshot().members, set(&["A", "B", "C"]));
}

#[tokio::test]
async fn test_failed_emission_is_not_resent_next_run() {
    let emitter = RecordingEmitter::new().failing_for(&["B"]);
    let store = MemorySnapshotStore::new();
    let reconciler = Reconciler::new(emitter.clone(), store.clone());

    let first = MockMembershipSource::new().with_page(&["A", "B"]);
    run_once(&first, &reconciler, &segment(), RunOptions::default())
        .await
        .unwrap();

    let second = MockMembershipSource::new().with_page(&["A", "B"]);
    let report = run_once(&second, &reconciler, &segment(), RunOptions::default())
        .await
        .unwrap();

    // The snapshot tracks remote state, so B is already known
    assert_eq!((report.joined, report.left), (0, 0));
    assert_eq!(emitter.attempts().len(), 2);
}

#[tokio::test]
async fn test_multi_page_fetch_with_boundary_duplicate() {
    let source = MockMembershipSource::new()
        .with_page(&["A", "B"])
        .with_page(&["B", "C"])
        .with_page(&["D"]);
    let options = RunOptions {
        page_size: 2,
        dry_run: false,
    };
    let emitter = RecordingEmitter::new();
    let store = MemorySnapshotStore::new();
    let reconciler = Reconciler::new(emitter.clone(), store.clone());

    let report = run_once(&source, &reconciler, &segment(), options)
        .await
        .unwrap();

    assert_eq!(report.joined, 4);
    let joined: Vec<_> = emitter
        .events()
        .iter()
        .map(|e| e.profile_id.to_string())
        .collect();
    assert_eq!(joined.len(), 4);
    assert_eq!(joined.iter().filter(|id| *id == "B").count(), 1);
    assert_eq!(store.snapshot().members, set(&["A", "B", "C", "D"]));
}

#[tokio::test]
async fn test_dry_run_sends_and_saves_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engaged.json");
    let store = FileSnapshotStore::new(&path);
    store
        .save(&Snapshot::new(set(&["A", "B"]), MemorySnapshotStore::seeded_at()))
        .await
        .unwrap();
    let before = std::fs::read(&path).unwrap();

    let emitter = RecordingEmitter::new();
    let reconciler = Reconciler::new(emitter.clone(), store);
    let source = MockMembershipSource::new().with_page(&["B", "C"]);
    let options = RunOptions {
        dry_run: true,
        ..Default::default()
    };

    let report = run_once(&source, &reconciler, &segment(), options)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert!(!report.persisted);
    assert_eq!((report.joined, report.left), (1, 1));
    assert_eq!(report.delivered(), 0);
    assert!(emitter.attempts().is_empty());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_snapshot_write_failure_fails_run() {
    let emitter = RecordingEmitter::new();
    let reconciler = Reconciler::new(emitter.clone(), MemorySnapshotStore::new().failing_saves());
    let source = MockMembershipSource::new().with_page(&["A"]);

    let err = run_once(&source, &reconciler, &segment(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Reconcile(_)));
    assert_eq!(emitter.events().len(), 1);
}
