//! Integration tests for enforcement, rollback, and export.

use aclwarden_core::acl::{Entry, parse_entries};
use aclwarden_core::client::TreeClient;
use aclwarden_core::memory::MemoryTree;
use aclwarden_core::Error;
use aclwarden_engine::enforce::{EnforceMode, Enforcer, Policy};
use aclwarden_engine::export::export;
use aclwarden_engine::query::QueryDef;
use aclwarden_engine::rollback::{RollbackRecord, restore};

use crate::common::{FlakyWriter, fixture_tree};

fn entries(list: &[&str]) -> Vec<Entry> {
    parse_entries(list).unwrap()
}

fn close_open_nodes() -> Policy {
    Policy {
        title: "close open nodes".to_string(),
        query: QueryDef::new("acl_glob", "/", &["world:anyone:*"]),
        append: false,
        entries: vec!["sasl:ops:rwcda".to_string()],
    }
}

#[test]
fn test_enforce_then_restore_returns_original_tree() {
    let tree = fixture_tree();
    let (before, _) = export(&tree, "/").unwrap();

    let mut records: Vec<RollbackRecord> = Vec::new();
    let outcome = Enforcer::new(&tree, EnforceMode::Live)
        .enforce(&close_open_nodes(), &mut records)
        .unwrap();
    assert_eq!(outcome.matched_paths(), vec!["/", "/a/y", "/c", "/c/z"]);
    assert_eq!(tree.get_entries("/c/z").unwrap(), entries(&["sasl:ops:rwcda"]));

    let summary = restore(&tree, &records).unwrap();
    assert_eq!(summary.restored, 4);

    let (after, _) = export(&tree, "/").unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_second_policy_on_same_node_restores_to_earliest() {
    let tree = fixture_tree();
    let first = close_open_nodes();
    let second = Policy {
        title: "append auditor".to_string(),
        query: QueryDef::new("path_glob", "/a/y", &["/a/y"]),
        append: true,
        entries: vec!["sasl:auditor:r".to_string()],
    };

    let mut records = Vec::new();
    Enforcer::new(&tree, EnforceMode::Live)
        .enforce_all(&[first, second], &mut records)
        .unwrap();
    assert_eq!(
        tree.get_entries("/a/y").unwrap(),
        entries(&["sasl:ops:rwcda", "sasl:auditor:r"])
    );

    restore(&tree, &records).unwrap();
    assert_eq!(
        tree.get_entries("/a/y").unwrap(),
        entries(&["world:anyone:rwcda"])
    );
}

#[test]
fn test_transport_failure_midway_keeps_records_for_written_nodes() {
    let client = FlakyWriter::new(fixture_tree(), 2);

    let mut records = Vec::new();
    let err = Enforcer::new(&client, EnforceMode::Live)
        .enforce(&close_open_nodes(), &mut records)
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));

    // the record for the failed write was taken before it was attempted
    let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/", "/a/y", "/c"]);
    assert_eq!(client.inner.stats().writes, 2);

    restore(&client.inner, &records).unwrap();
    assert_eq!(
        client.inner.get_entries("/").unwrap(),
        entries(&["world:anyone:rwcda"])
    );
}

#[test]
fn test_dry_run_plans_without_writing() {
    let tree = fixture_tree();
    tree.reset_stats();

    let mut records = Vec::new();
    let outcome = Enforcer::new(&tree, EnforceMode::DryRun)
        .enforce(&close_open_nodes(), &mut records)
        .unwrap();

    assert_eq!(outcome.changes.len(), 4);
    assert!(records.is_empty());
    assert_eq!(tree.stats().writes, 0);
}

#[test]
fn test_export_round_trip_through_json() {
    let tree = fixture_tree();
    tree.deny_read("/b/secret");

    let (snapshot, _) = export(&tree, "/").unwrap();
    let json = snapshot.to_json().unwrap();
    let reloaded = MemoryTree::from_snapshot(
        &aclwarden_core::memory::Snapshot::from_json(&json).unwrap(),
    )
    .unwrap();

    assert_eq!(
        reloaded.get_entries("/c").unwrap(),
        entries(&["ip:10.0.0.0/8:r", "world:anyone:r"])
    );
    assert!(matches!(
        reloaded.get_entries("/b/secret"),
        Err(Error::Authorization { .. })
    ));
    assert!(matches!(
        reloaded.get_entries("/b/secret/deep"),
        Err(Error::NotFound { .. })
    ));
}
