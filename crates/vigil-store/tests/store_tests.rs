// SPDX-License-Identifier: Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Transaction protocol tests over a real on-disk store.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use vigil_store::{FaultPoint, FileLock, StoreError, TransactOptions, TxControl, WorldStore};

fn file_digest(path: &Path) -> String {
    let bytes = fs::read(path).unwrap_or_default();
    hex::encode(Sha256::digest(bytes))
}

fn tmp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect()
}

#[test]
fn commit_is_visible_to_a_second_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");

    let store = WorldStore::open(&path);
    store
        .transact(TransactOptions::default(), |doc| {
            doc.world.clock.day = 7;
            TxControl::Commit(())
        })
        .unwrap();

    let other = WorldStore::open(&path);
    assert_eq!(other.recall_world().clock.day, 7);
}

#[test]
fn duplicate_event_id_skips_and_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let store = WorldStore::open(&path);

    let first = store
        .transact(TransactOptions::with_event_id("ev:1"), |doc| {
            doc.world.war_active = true;
            TxControl::Commit("ran")
        })
        .unwrap();
    assert!(!first.skipped);
    assert_eq!(first.result, Some("ran"));

    let before = file_digest(&path);
    let second = store
        .transact(TransactOptions::with_event_id("ev:1"), |doc| {
            doc.world.war_active = false;
            TxControl::Commit("ran again")
        })
        .unwrap();
    assert!(second.skipped);
    assert_eq!(second.result, None);
    assert_eq!(file_digest(&path), before);
    assert!(store.has_processed_event("ev:1"));
}

#[test]
fn cross_store_dedup_through_the_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");

    let writer = WorldStore::open(&path);
    writer
        .transact(TransactOptions::with_event_id("ev:shared"), |doc| {
            doc.world.clock.day = 3;
            TxControl::Commit(())
        })
        .unwrap();

    // A different store instance over the same path must observe the dedup
    // ledger on reload, not its own stale cache.
    let late = WorldStore::open(&path);
    let outcome = late
        .transact(TransactOptions::with_event_id("ev:shared"), |doc| {
            doc.world.clock.day = 99;
            TxControl::Commit(())
        })
        .unwrap();
    assert!(outcome.skipped);
    assert_eq!(late.recall_world().clock.day, 3);
}

#[test]
fn reject_neither_persists_nor_consumes_the_event_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let store = WorldStore::open(&path);
    store
        .transact(TransactOptions::default(), |doc| {
            doc.world.clock.day = 2;
            TxControl::Commit(())
        })
        .unwrap();

    let before = file_digest(&path);
    let outcome = store
        .transact(TransactOptions::with_event_id("ev:rejected"), |doc| {
            doc.world.clock.day = 40;
            TxControl::Reject("unknown town")
        })
        .unwrap();
    assert!(!outcome.skipped);
    assert_eq!(outcome.result, Some("unknown town"));
    assert_eq!(file_digest(&path), before);
    assert!(!store.has_processed_event("ev:rejected"));

    // The corrected retry with the same id still runs.
    let retry = store
        .transact(TransactOptions::with_event_id("ev:rejected"), |doc| {
            doc.world.clock.day = 4;
            TxControl::Commit(())
        })
        .unwrap();
    assert!(!retry.skipped);
    assert_eq!(store.recall_world().clock.day, 4);
}

#[test]
fn simulated_crash_preserves_snapshot_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let store = WorldStore::open(&path);
    store
        .transact(TransactOptions::default(), |doc| {
            doc.world.clock.day = 5;
            TxControl::Commit(())
        })
        .unwrap();

    let before = file_digest(&path);
    store.arm_fault(FaultPoint::BeforeRename);
    let err = store
        .transact(TransactOptions::with_event_id("ev:crash"), |doc| {
            doc.world.clock.day = 6;
            TxControl::Commit(())
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::SimulatedCrash));

    assert_eq!(file_digest(&path), before, "snapshot must be preserved");
    assert!(tmp_files(dir.path()).is_empty(), "temp file must be removed");
    assert!(
        !FileLock::sidecar(&path).exists(),
        "lock sidecar must be removed"
    );

    // The event id was not consumed; the retry succeeds.
    let retry = store
        .transact(TransactOptions::with_event_id("ev:crash"), |doc| {
            doc.world.clock.day = 6;
            TxControl::Commit(())
        })
        .unwrap();
    assert!(!retry.skipped);
}

#[test]
fn held_lock_times_out_and_releases_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let store = WorldStore::open(&path);

    let held = FileLock::acquire(&path).unwrap();
    let err = store
        .transact(TransactOptions::default(), |_doc| TxControl::Commit(()))
        .unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout { .. }));
    assert!(FileLock::sidecar(&path).exists(), "foreign lock must survive");
    held.release().unwrap();

    store
        .transact(TransactOptions::default(), |_doc| TxControl::Commit(()))
        .unwrap();
}

#[test]
fn malformed_file_degrades_to_fresh_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    fs::write(&path, b"{ not json").unwrap();

    let store = WorldStore::open(&path);
    assert_eq!(store.recall_world().clock.day, 1);
    // A commit rewrites the file in canonical form.
    store
        .transact(TransactOptions::default(), |doc| {
            doc.world.clock.day = 2;
            TxControl::Commit(())
        })
        .unwrap();
    assert_eq!(WorldStore::open(&path).recall_world().clock.day, 2);
}

#[test]
fn remember_wrappers_append_and_dedup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let store = WorldStore::open(&path);

    store
        .remember_agent("Mara", "met the warden", false, Some("note:1".to_owned()))
        .unwrap();
    let replay = store
        .remember_agent("Mara", "met the warden", false, Some("note:1".to_owned()))
        .unwrap();
    assert!(replay.skipped);

    let agent = store.recall_agent("Mara").unwrap();
    assert_eq!(agent.short_notes.len(), 1);
    assert_eq!(agent.short_notes[0].text, "met the warden");

    store.remember_faction("pact", "sworn to the road", None).unwrap();
    assert_eq!(store.recall_faction("pact").unwrap().long_notes.len(), 1);

    store.remember_world("the gates held", true, None).unwrap();
    assert_eq!(store.recall_world().chronicle.len(), 1);

    assert!(store.validate_memory_integrity().ok());
}

#[test]
fn empty_inputs_are_rejected_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let store = WorldStore::open(&path);
    let err = store.remember_agent("  ", "note", false, None).unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
    assert!(store.recall_agent("").is_none());
}
