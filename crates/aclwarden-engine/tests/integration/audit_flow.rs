//! Integration tests for audit batches and checks.

use aclwarden_engine::audit::{AuditItem, Auditor, ItemOutcome};
use aclwarden_engine::check::{CheckDef, CheckStatus};
use aclwarden_engine::query::QueryDef;

use crate::common::fixture_tree;

fn check(title: &str, root: &str, path: &str, entries: &[&str]) -> CheckDef {
    CheckDef {
        title: title.to_string(),
        root: root.to_string(),
        path: path.to_string(),
        regex: false,
        entries: entries.iter().map(|e| e.to_string()).collect(),
        negate: false,
    }
}

fn batch() -> Vec<AuditItem> {
    vec![
        AuditItem::Query(QueryDef::new("open", "/a", &[])),
        AuditItem::Check(check("app owns /a", "/a", "/a/*", &["sasl:app:rwcda"])),
        AuditItem::Query(QueryDef::new("duplicates", "/c", &[])),
        AuditItem::Check(check("ops read", "/c", "*", &["world:anyone:r"])),
        AuditItem::Query(QueryDef::new("same_as_parent", "/a", &[])),
    ]
}

#[test]
fn test_batch_walks_each_root_once() {
    let tree = fixture_tree();
    tree.reset_stats();

    let report = Auditor::new(&tree).run(&batch()).unwrap();

    assert_eq!(report.traversals, 2);
    assert_eq!(report.items.len(), 5);
    // /a, /a/x, /a/y and /c, /c/z: one read of each per traversal
    assert_eq!(report.stats.visited, 5);
    assert_eq!(tree.stats().child_reads, 5);
}

#[test]
fn test_batch_outcomes_match_individual_runs() {
    let tree = fixture_tree();
    let report = Auditor::new(&tree).run(&batch()).unwrap();

    for (item, outcome) in batch().iter().zip(&report.items) {
        let alone = Auditor::new(&tree).run(std::slice::from_ref(item)).unwrap();
        assert_eq!(&alone.items[0], outcome);
    }
}

#[test]
fn test_check_statuses() {
    let tree = fixture_tree();
    let report = Auditor::new(&tree).run(&batch()).unwrap();

    let statuses: Vec<CheckStatus> = report.checks().map(|c| c.status()).collect();
    // /a/y is open, and /c carries an extra ip entry
    assert_eq!(statuses, vec![CheckStatus::Fail, CheckStatus::Fail]);

    let ItemOutcome::Check(owns) = &report.items[1] else {
        unreachable!("Expected check outcome");
    };
    let failures: Vec<&str> = owns.failures().map(|l| l.path.as_str()).collect();
    assert_eq!(failures, vec!["/a/y"]);
}

#[test]
fn test_invalid_item_does_not_disturb_batch() {
    let tree = fixture_tree();
    let mut items = batch();
    items.insert(2, AuditItem::Check(check("broken", "/a", "[", &["x"])));

    let report = Auditor::new(&tree).run(&items).unwrap();
    assert_eq!(report.traversals, 2);

    let ItemOutcome::Check(broken) = &report.items[2] else {
        unreachable!("Expected check outcome");
    };
    assert!(matches!(broken.status(), CheckStatus::Invalid(_)));
    assert!(!report.all_checks_pass());
}

#[test]
fn test_unreadable_nodes_visible_to_every_item() {
    let tree = fixture_tree();
    tree.deny_read("/a/y");
    let report = Auditor::new(&tree).run(&batch()).unwrap();

    let ItemOutcome::Query(open) = &report.items[0] else {
        unreachable!("Expected query outcome");
    };
    assert!(open.matched_paths().is_empty());
    assert_eq!(open.skipped().count(), 1);

    let ItemOutcome::Check(owns) = &report.items[1] else {
        unreachable!("Expected check outcome");
    };
    assert_eq!(owns.skipped.len(), 1);
    assert_eq!(owns.status(), CheckStatus::Pass);
}
