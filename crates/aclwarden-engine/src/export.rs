//! Snapshot export of a subtree.

use aclwarden_core::client::TreeClient;
use aclwarden_core::memory::{Snapshot, SnapshotNode};
use aclwarden_core::Result;

use crate::query::check_root;
use crate::walker::{Skip, SkipReason, Visitor, WalkNode, WalkStats, Walker};

#[derive(Default)]
struct Collect {
    nodes: Vec<SnapshotNode>,
}

impl Visitor for Collect {
    fn visit(&mut self, node: &WalkNode<'_>) -> Result<()> {
        self.nodes.push(SnapshotNode {
            path: node.path.to_string(),
            acl: node.entries.to_vec(),
            acl_version: 0,
            unreadable: false,
        });
        Ok(())
    }

    // Unreadable nodes are kept so a reload reproduces the pruning.
    fn skip(&mut self, skip: &Skip) {
        if skip.reason == SkipReason::Unauthorized {
            self.nodes.push(SnapshotNode {
                path: skip.path.clone(),
                acl: Vec::new(),
                acl_version: 0,
                unreadable: true,
            });
        }
    }
}

/// Walk the subtree at `root` and capture every reachable node.
pub fn export<C: TreeClient + ?Sized>(client: &C, root: &str) -> Result<(Snapshot, WalkStats)> {
    check_root(client, root)?;
    let mut collect = Collect::default();
    let stats = Walker::new(client).walk(root, &mut collect)?;
    log::info!("Exported {} nodes from {root}", collect.nodes.len());
    Ok((
        Snapshot {
            nodes: collect.nodes,
        },
        stats,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aclwarden_core::memory::MemoryTree;

    #[test]
    fn test_export_reload_round_trip() {
        let tree = MemoryTree::new();
        tree.insert_str("/a/b", &["sasl:x:rw", "world:anyone:r"]).unwrap();
        tree.insert_str("/c", &["ip:10.0.0.0/8:r"]).unwrap();

        let (snapshot, stats) = export(&tree, "/").unwrap();
        assert_eq!(stats.visited, 4);

        let reloaded = MemoryTree::from_snapshot(&snapshot).unwrap();
        for path in ["/", "/a", "/a/b", "/c"] {
            assert_eq!(
                reloaded.get_entries(path).unwrap(),
                tree.get_entries(path).unwrap()
            );
        }
    }

    #[test]
    fn test_export_marks_unreadable() {
        let tree = MemoryTree::new();
        tree.insert_str("/hidden/inner", &["world:anyone:r"]).unwrap();
        tree.deny_read("/hidden");

        let (snapshot, stats) = export(&tree, "/").unwrap();
        assert_eq!(stats.skipped, 1);
        let paths: Vec<&str> = snapshot.nodes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/hidden"]);
        assert!(snapshot.nodes[1].unreadable);
    }

    #[test]
    fn test_export_subtree() {
        let tree = MemoryTree::new();
        tree.insert_str("/a/b", &["world:anyone:r"]).unwrap();
        tree.insert_str("/z", &["world:anyone:r"]).unwrap();
        let (snapshot, _) = export(&tree, "/a").unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
    }
}
