//! Integration tests for subtree pruning and vanished nodes.

use aclwarden_engine::audit::Auditor;
use aclwarden_engine::query::{QueryDef, run_query};
use aclwarden_engine::walker::SkipReason;

use crate::common::{PhantomChild, fixture_tree};

#[test]
fn test_unreadable_subtree_is_skipped_once() {
    let tree = fixture_tree();
    tree.deny_read("/b");

    let outcome = Auditor::new(&tree).inventory().unwrap();

    let skipped: Vec<_> = outcome.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].path, "/b");
    assert_eq!(skipped[0].reason, SkipReason::Unauthorized);

    let visited = outcome.matched_paths();
    assert!(visited.iter().all(|p| !p.starts_with("/b")));
    assert_eq!(visited, vec!["/", "/a", "/a/x", "/a/y", "/c", "/c/z"]);
}

#[test]
fn test_unreadable_node_below_root_keeps_siblings() {
    let tree = fixture_tree();
    tree.deny_read("/b/secret");

    let outcome = run_query(&tree, &QueryDef::new("all", "/b", &[])).unwrap();
    assert_eq!(outcome.matched_paths(), vec!["/b"]);
    assert_eq!(outcome.skipped().count(), 1);
}

#[test]
fn test_vanished_child_is_reported_and_walk_continues() {
    let client = PhantomChild {
        inner: fixture_tree(),
        parent: "/a",
        name: "ghost",
    };

    let outcome = run_query(&client, &QueryDef::new("all", "/a", &[])).unwrap();

    let skipped: Vec<_> = outcome.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].path, "/a/ghost");
    assert_eq!(skipped[0].reason, SkipReason::Vanished);
    assert_eq!(outcome.matched_paths(), vec!["/a", "/a/x", "/a/y"]);
}

#[test]
fn test_predicates_over_fixture() {
    let tree = fixture_tree();

    let open = run_query(&tree, &QueryDef::new("open", "/", &[])).unwrap();
    assert_eq!(open.matched_paths(), vec!["/", "/a/y"]);

    let dups = run_query(&tree, &QueryDef::new("duplicates", "/", &[])).unwrap();
    // world:anyone is equivalent to any identity with the same permissions
    assert_eq!(dups.matched_paths(), vec!["/c", "/c/z"]);

    let same = run_query(&tree, &QueryDef::new("same_as_parent", "/", &[])).unwrap();
    assert_eq!(same.matched_paths(), vec!["/a/x", "/b/secret/deep"]);

    // a subtree root is compared against its real parent
    let rooted = run_query(&tree, &QueryDef::new("same_as_parent", "/a/x", &[])).unwrap();
    assert_eq!(rooted.matched_paths(), vec!["/a/x"]);

    let glob = run_query(&tree, &QueryDef::new("acl_glob", "/", &["sasl:ops:*"])).unwrap();
    assert_eq!(
        glob.matched_paths(),
        vec!["/b", "/b/secret", "/b/secret/deep"]
    );

    let paths = run_query(&tree, &QueryDef::new("path_glob", "/", &["/c*"])).unwrap();
    assert_eq!(paths.matched_paths(), vec!["/c", "/c/z"]);
}

#[test]
fn test_subnet_satisfaction_over_fixture() {
    let tree = fixture_tree();
    let outcome = run_query(
        &tree,
        &QueryDef::new("satisfies", "/c", &["ip:10.1.2.3:r"]),
    )
    .unwrap();
    // /c via the subnet entry, /c/z via world:anyone
    assert_eq!(outcome.matched_paths(), vec!["/c", "/c/z"]);
    assert!(outcome.error.is_none());
}
