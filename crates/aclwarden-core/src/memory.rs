//! In-memory tree client and JSON snapshots.
//!
//! [`MemoryTree`] implements [`TreeClient`] over a sorted map of nodes.
//! It backs the CLI (which audits snapshot files) and the test suites,
//! and can simulate the failure modes of a live session: unreadable
//! nodes, nodes that vanish mid-walk, and transport failures.
//!
//! ```rust
//! use aclwarden_core::client::TreeClient;
//! use aclwarden_core::memory::MemoryTree;
//!
//! let tree = MemoryTree::new();
//! tree.insert_str("/app/config", &["digest:ops:c2VjcmV0:rwcda"]).unwrap();
//!
//! assert_eq!(tree.get_children("/").unwrap(), vec!["app".to_string()]);
//! assert_eq!(tree.get_entries("/app/config").unwrap()[0].to_string(),
//!            "digest:ops:c2VjcmV0:rwcda");
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::acl::{Entry, Perms, parse_entries};
use crate::client::{TreeClient, Version};
use crate::path::{ROOT, parent, validate_path};
use crate::{Error, Result};

// ============================================================================
// Snapshot
// ============================================================================

/// One node of a serialized tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Absolute node path
    pub path: String,
    /// Entry list in canonical form
    pub acl: Vec<Entry>,
    /// ACL version
    #[serde(default)]
    pub acl_version: i32,
    /// Simulate a node the session may not read
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unreadable: bool,
}

/// A serialized tree: every node with its entry list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Nodes, parents before children
    pub nodes: Vec<SnapshotNode>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Write a snapshot file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

// ============================================================================
// MemoryTree
// ============================================================================

/// Round trips served by a [`MemoryTree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// `get_entries` calls
    pub entry_reads: usize,
    /// `get_children` calls
    pub child_reads: usize,
    /// Successful `set_entries` calls
    pub writes: usize,
}

#[derive(Debug, Clone)]
struct Node {
    entries: Vec<Entry>,
    acl_version: i32,
    unreadable: bool,
}

impl Node {
    fn open() -> Self {
        Self {
            entries: vec![Entry::world_anyone(Perms::all())],
            acl_version: 0,
            unreadable: false,
        }
    }
}

/// Tree client over an in-memory map.
///
/// Single-threaded: interior mutability lets writes go through `&self`
/// like a session handle would.
#[derive(Debug)]
pub struct MemoryTree {
    nodes: RefCell<BTreeMap<String, Node>>,
    broken: RefCell<BTreeSet<String>>,
    stats: Cell<TreeStats>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// A tree holding only `/`, open to everyone.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT.to_string(), Node::open());
        Self {
            nodes: RefCell::new(nodes),
            broken: RefCell::new(BTreeSet::new()),
            stats: Cell::new(TreeStats::default()),
        }
    }

    /// Build a tree from a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let tree = Self::new();
        for node in &snapshot.nodes {
            tree.insert(&node.path, node.acl.clone())?;
            let mut nodes = tree.nodes.borrow_mut();
            if let Some(stored) = nodes.get_mut(&node.path) {
                stored.acl_version = node.acl_version;
                stored.unreadable = node.unreadable;
            }
        }
        log::debug!("Loaded {} nodes from snapshot", snapshot.nodes.len());
        Ok(tree)
    }

    /// Every node, sorted by path.
    pub fn to_snapshot(&self) -> Snapshot {
        let nodes = self
            .nodes
            .borrow()
            .iter()
            .map(|(path, node)| SnapshotNode {
                path: path.clone(),
                acl: node.entries.clone(),
                acl_version: node.acl_version,
                unreadable: node.unreadable,
            })
            .collect();
        Snapshot { nodes }
    }

    /// Insert or replace a node; missing ancestors are created open.
    pub fn insert(&self, path: &str, entries: Vec<Entry>) -> Result<()> {
        validate_path(path)?;
        let mut nodes = self.nodes.borrow_mut();

        let mut ancestor = parent(path);
        while let Some(p) = ancestor {
            nodes.entry(p.to_string()).or_insert_with(Node::open);
            ancestor = parent(p);
        }

        let node = nodes.entry(path.to_string()).or_insert_with(Node::open);
        node.entries = entries;
        Ok(())
    }

    /// [`insert`](Self::insert) with entries in wire form.
    pub fn insert_str(&self, path: &str, entries: &[&str]) -> Result<()> {
        self.insert(path, parse_entries(entries)?)
    }

    /// Make `path` unreadable for this session.
    pub fn deny_read(&self, path: &str) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(path) {
            node.unreadable = true;
        }
    }

    /// Make every call touching `path` fail with a transport error.
    pub fn break_transport(&self, path: &str) {
        self.broken.borrow_mut().insert(path.to_string());
    }

    /// Current ACL version of a node.
    pub fn acl_version(&self, path: &str) -> Option<i32> {
        self.nodes.borrow().get(path).map(|n| n.acl_version)
    }

    /// Calls served so far.
    pub fn stats(&self) -> TreeStats {
        self.stats.get()
    }

    /// Zero the call counters.
    pub fn reset_stats(&self) {
        self.stats.set(TreeStats::default());
    }

    fn count(&self, f: impl FnOnce(&mut TreeStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn check_transport(&self, path: &str) -> Result<()> {
        if self.broken.borrow().contains(path) {
            return Err(Error::transport(format!("connection lost while accessing {path}")));
        }
        Ok(())
    }

    fn readable(&self, path: &str) -> Result<()> {
        self.check_transport(path)?;
        match self.nodes.borrow().get(path) {
            None => Err(Error::not_found(path)),
            Some(node) if node.unreadable => Err(Error::authorization(path)),
            Some(_) => Ok(()),
        }
    }
}

impl TreeClient for MemoryTree {
    fn get_entries(&self, path: &str) -> Result<Vec<Entry>> {
        self.count(|s| s.entry_reads += 1);
        self.readable(path)?;
        Ok(self
            .nodes
            .borrow()
            .get(path)
            .map(|n| n.entries.clone())
            .unwrap_or_default())
    }

    fn get_children(&self, path: &str) -> Result<Vec<String>> {
        self.count(|s| s.child_reads += 1);
        self.readable(path)?;

        let prefix = if path == ROOT {
            ROOT.to_string()
        } else {
            format!("{path}/")
        };
        let nodes = self.nodes.borrow();
        let children = nodes
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .map(|(p, _)| &p[prefix.len()..])
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect();
        Ok(children)
    }

    fn set_entries(&self, path: &str, entries: &[Entry], version: Version) -> Result<()> {
        self.check_transport(path)?;
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes.get_mut(path).ok_or_else(|| Error::not_found(path))?;

        if let Version::Exact(expected) = version {
            if expected != node.acl_version {
                log::debug!(
                    "Rejected write to {path}: expected version {expected}, found {}",
                    node.acl_version
                );
                return Err(Error::BadVersion {
                    path: path.to_string(),
                    expected,
                    actual: node.acl_version,
                });
            }
        }

        node.entries = entries.to_vec();
        node.acl_version += 1;
        drop(nodes);
        self.count(|s| s.writes += 1);
        Ok(())
    }
}
