//! Integration tests for progress snapshot persistence.

use callsync::resume::{ProgressSnapshot, SnapshotStore};
use tempfile::TempDir;

use crate::support::mock_api::call;

#[test]
fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("download_progress.json"));

    let mut snapshot = ProgressSnapshot::empty();
    snapshot.set_discovered(vec![call("c1"), call("c2"), call("c3")]);
    snapshot.record_fetched(["c3".to_string(), "c1".to_string()]);
    store.save(&snapshot).unwrap();

    let loaded = store.load();
    // Discovery order and the fetched set must survive the round trip.
    assert_eq!(loaded.discovered_calls(), snapshot.discovered_calls());
    assert_eq!(loaded.fetched_ids(), snapshot.fetched_ids());
    assert_eq!(loaded.missing_ids(), vec!["c2"]);
}

#[test]
fn test_snapshot_preserves_call_attribute_bag() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("download_progress.json"));

    let mut discovered = call("c1");
    discovered.extra.insert(
        "customField".to_string(),
        serde_json::json!({"nested": true}),
    );

    let mut snapshot = ProgressSnapshot::empty();
    snapshot.set_discovered(vec![discovered.clone()]);
    store.save(&snapshot).unwrap();

    let loaded = store.load();
    assert_eq!(loaded.discovered_calls()[0], discovered);
}

#[test]
fn test_missing_snapshot_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("never_written.json"));

    let snapshot = store.load();
    assert!(!snapshot.has_discovered());
    assert!(snapshot.fetched_ids().is_empty());
}

#[test]
fn test_corrupt_snapshot_degrades_to_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("download_progress.json");
    std::fs::write(&path, "definitely not json").unwrap();

    // A bad checkpoint must never fail the caller.
    let snapshot = SnapshotStore::new(&path).load();
    assert!(!snapshot.has_discovered());
}

#[test]
fn test_save_overwrites_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("download_progress.json"));

    let mut snapshot = ProgressSnapshot::empty();
    snapshot.set_discovered(vec![call("c1"), call("c2")]);
    store.save(&snapshot).unwrap();

    snapshot.record_fetched(["c1".to_string()]);
    store.save(&snapshot).unwrap();

    let loaded = store.load();
    assert_eq!(loaded.fetched_ids().len(), 1);
    assert_eq!(loaded.missing_ids(), vec!["c2"]);
}

#[test]
fn test_clear_then_load_is_fresh() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("download_progress.json"));

    let mut snapshot = ProgressSnapshot::empty();
    snapshot.set_discovered(vec![call("c1")]);
    store.save(&snapshot).unwrap();

    store.clear();
    assert!(!store.path().exists());
    assert!(!store.load().has_discovered());
}
