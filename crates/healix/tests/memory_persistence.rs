//! Healing memory on disk: restarts, corruption and reviewer transitions.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use healix::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn storage(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        cache_file: dir.path().join("healix_cache.json"),
        ledger_file: dir.path().join("healix_proposals.json"),
    }
}

#[test]
fn test_commit_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let store = MemoryStore::from_config(&storage(&dir));
        store.commit("#old-id", "#new-id").unwrap();
        store
            .record_proposal(SourceLocation::new("tests/login.rs", 14), "#old-id", "#new-id")
            .unwrap();
    }

    let store = MemoryStore::from_config(&storage(&dir));
    assert_eq!(store.lookup("#old-id").as_deref(), Some("#new-id"));
    let proposals = store.proposals();
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].source_location.line, 14);
    assert!(!store.is_degraded());
}

#[test]
fn test_cache_file_format() {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir);
    let store = MemoryStore::from_config(&config);
    store.commit("#b", "#2").unwrap();
    store.commit("#a", "#1").unwrap();

    let raw = fs::read_to_string(&config.cache_file).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, serde_json::json!({"#a": "#1", "#b": "#2"}));
}

#[test]
fn test_existing_flat_cache_file_is_read() {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir);
    fs::write(&config.cache_file, r##"{"#login-btn": "#login-button"}"##).unwrap();

    let store = MemoryStore::from_config(&config);
    assert_eq!(store.lookup("#login-btn").as_deref(), Some("#login-button"));
}

#[test]
fn test_corrupted_cache_starts_empty_and_degraded() {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir);
    fs::write(&config.cache_file, "{\"#a\": ").unwrap();

    let store = MemoryStore::from_config(&config);
    assert!(store.is_empty());
    assert!(store.is_degraded());

    // the next commit rewrites a valid file
    store.commit("#a", "#b").unwrap();
    let reopened = MemoryStore::from_config(&config);
    assert_eq!(reopened.lookup("#a").as_deref(), Some("#b"));
}

#[test]
fn test_wrong_shape_ledger_is_corrupted() {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir);
    fs::write(&config.ledger_file, r#"{"not": "an array"}"#).unwrap();

    let store = MemoryStore::from_config(&config);
    assert!(store.proposals().is_empty());
    assert!(store.is_degraded());
}

#[test]
fn test_unreadable_ledger_kept_aside_for_review() {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir);
    let damaged = r##"[{"id": "3f2a9c1e-8b7d-4e6f-a5b4-c3d2e1f0a9b8", "original_locator": "#a""##;
    fs::write(&config.ledger_file, damaged).unwrap();

    let store = MemoryStore::from_config(&config);
    assert!(store.is_degraded());
    store
        .record_proposal(SourceLocation::new("t.rs", 9), "#x", "#y")
        .unwrap();

    let aside = corrupt_path(&config.ledger_file);
    assert_eq!(fs::read_to_string(&aside).unwrap(), damaged);
    assert_eq!(MemoryStore::from_config(&config).proposals().len(), 1);
}

#[test]
fn test_review_transition_persists() {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir);
    let store = MemoryStore::from_config(&config);
    let first = store
        .record_proposal(SourceLocation::new("t.rs", 1), "#a", "#b")
        .unwrap();
    store
        .record_proposal(SourceLocation::new("t.rs", 2), "#a", "#c")
        .unwrap();

    store
        .set_proposal_status(&first.id.to_string(), ProposalStatus::Rejected)
        .unwrap();

    let reopened = MemoryStore::from_config(&config);
    let proposals = reopened.proposals();
    assert_eq!(proposals[0].status, ProposalStatus::Rejected);
    assert_eq!(proposals[1].status, ProposalStatus::PendingReview);
    assert_eq!(reopened.pending_proposals().len(), 1);
}

#[test]
fn test_parallel_commits_all_reach_disk() {
    let dir = TempDir::new().unwrap();
    let config = storage(&dir);
    let store = Arc::new(MemoryStore::from_config(&config));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..10 {
                    store
                        .commit(&format!("#w{worker}-{i}"), &format!("#ok-{i}"))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reopened = MemoryStore::from_config(&config);
    assert_eq!(reopened.len(), 40);
}
