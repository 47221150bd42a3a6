//! Authorization-aware pre-order tree walk.
//!
//! The walker fetches each node's entries and children, hands the node to
//! a [`Visitor`], then descends into the children in sorted order. A node
//! the session may not read is reported once through [`Visitor::skip`]
//! and its subtree is pruned; the rest of the walk is unaffected.
//!
//! # Example
//!
//! ```rust
//! use aclwarden_core::memory::MemoryTree;
//! use aclwarden_engine::walker::{Visitor, WalkNode, Walker};
//!
//! struct Paths(Vec<String>);
//!
//! impl Visitor for Paths {
//!     fn visit(&mut self, node: &WalkNode<'_>) -> aclwarden_core::Result<()> {
//!         self.0.push(node.path.to_string());
//!         Ok(())
//!     }
//! }
//!
//! let tree = MemoryTree::new();
//! tree.insert_str("/b", &["world:anyone:r"]).unwrap();
//! tree.insert_str("/a", &["world:anyone:r"]).unwrap();
//!
//! let mut paths = Paths(Vec::new());
//! Walker::new(&tree).walk("/", &mut paths).unwrap();
//! assert_eq!(paths.0, vec!["/", "/a", "/b"]);
//! ```

use std::fmt;
use std::ops::AddAssign;

use aclwarden_core::acl::Entry;
use aclwarden_core::client::TreeClient;
use aclwarden_core::path::{join, parent, validate_path};
use aclwarden_core::predicate::NodeContext;
use aclwarden_core::{Error, Result};
use serde::Serialize;

// ============================================================================
// Events
// ============================================================================

/// One readable node, as seen by a visitor.
#[derive(Debug, Clone, Copy)]
pub struct WalkNode<'a> {
    /// Node path
    pub path: &'a str,
    /// Distance from the walk root
    pub depth: usize,
    /// Node entries
    pub entries: &'a [Entry],
    /// Parent entries; `None` for `/` or when the root's parent is unreadable
    pub parent_entries: Option<&'a [Entry]>,
    /// Child names, sorted
    pub children: &'a [String],
}

impl<'a> WalkNode<'a> {
    /// The predicate view of this node.
    pub fn context(&self) -> NodeContext<'a> {
        NodeContext::new(self.path, self.entries, self.parent_entries)
    }
}

/// Why a node was not visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The session may not read the node; its subtree is pruned
    Unauthorized,
    /// The node disappeared between listing and visiting
    Vanished,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "not authorized"),
            Self::Vanished => write!(f, "vanished"),
        }
    }
}

/// A node the walk could not visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    /// Node path
    pub path: String,
    /// Distance from the walk root
    pub depth: usize,
    /// Why it was skipped
    pub reason: SkipReason,
}

/// Receives the nodes of a walk.
///
/// Returning an error from [`visit`](Visitor::visit) aborts the walk.
/// Visitors that can contain a failure to themselves should record it and
/// return `Ok`.
pub trait Visitor {
    /// Called once per readable node, parents before children.
    fn visit(&mut self, node: &WalkNode<'_>) -> Result<()>;

    /// Called once per node that could not be visited.
    fn skip(&mut self, skip: &Skip) {
        let _ = skip;
    }
}

/// Forwards every event to several visitors, in order.
pub struct Fanout<'v> {
    visitors: Vec<&'v mut dyn Visitor>,
}

impl<'v> Fanout<'v> {
    /// Wrap a set of visitors.
    pub fn new(visitors: Vec<&'v mut dyn Visitor>) -> Self {
        Self { visitors }
    }
}

impl Visitor for Fanout<'_> {
    fn visit(&mut self, node: &WalkNode<'_>) -> Result<()> {
        for visitor in self.visitors.iter_mut() {
            visitor.visit(node)?;
        }
        Ok(())
    }

    fn skip(&mut self, skip: &Skip) {
        for visitor in self.visitors.iter_mut() {
            visitor.skip(skip);
        }
    }
}

// ============================================================================
// Walker
// ============================================================================

/// Counters for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Nodes handed to the visitor
    pub visited: usize,
    /// Nodes reported as skipped
    pub skipped: usize,
}

impl AddAssign for WalkStats {
    fn add_assign(&mut self, rhs: Self) {
        self.visited += rhs.visited;
        self.skipped += rhs.skipped;
    }
}

/// Recursive walker over a [`TreeClient`].
pub struct Walker<'c, C: ?Sized> {
    client: &'c C,
}

impl<'c, C: TreeClient + ?Sized> Walker<'c, C> {
    /// Walk through `client`.
    pub fn new(client: &'c C) -> Self {
        Self { client }
    }

    /// Walk the subtree at `root`.
    ///
    /// A missing root is an error; a missing descendant is reported as
    /// [`SkipReason::Vanished`].
    pub fn walk(&self, root: &str, visitor: &mut dyn Visitor) -> Result<WalkStats> {
        validate_path(root)?;
        log::debug!("Walking {root}");

        let root_parent = self.root_parent(root)?;
        let mut stats = WalkStats::default();
        self.descend(root, 0, root_parent.as_deref(), visitor, &mut stats)?;

        log::debug!(
            "Walked {root}: {} visited, {} skipped",
            stats.visited,
            stats.skipped
        );
        Ok(stats)
    }

    /// Entries of the root's parent, so a subtree root is compared
    /// against its real parent.
    fn root_parent(&self, root: &str) -> Result<Option<Vec<Entry>>> {
        let Some(up) = parent(root) else {
            return Ok(None);
        };
        match self.client.get_entries(up) {
            Ok(entries) => Ok(Some(entries)),
            Err(Error::Authorization { .. } | Error::NotFound { .. }) => {
                log::debug!("No readable parent for walk root {root}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn fetch(&self, path: &str) -> Result<(Vec<Entry>, Vec<String>)> {
        let entries = self.client.get_entries(path)?;
        let children = self.client.get_children(path)?;
        Ok((entries, children))
    }

    fn descend(
        &self,
        path: &str,
        depth: usize,
        parent_entries: Option<&[Entry]>,
        visitor: &mut dyn Visitor,
        stats: &mut WalkStats,
    ) -> Result<()> {
        let (entries, mut children) = match self.fetch(path) {
            Ok(fetched) => fetched,
            Err(Error::Authorization { .. }) => {
                log::warn!("Skipping subtree {path}: not authorized");
                skip(path, depth, SkipReason::Unauthorized, visitor, stats);
                return Ok(());
            }
            Err(Error::NotFound { .. }) if depth > 0 => {
                log::debug!("Skipping {path}: node vanished during walk");
                skip(path, depth, SkipReason::Vanished, visitor, stats);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        children.sort();
        stats.visited += 1;
        visitor.visit(&WalkNode {
            path,
            depth,
            entries: &entries,
            parent_entries,
            children: &children,
        })?;

        for child in &children {
            self.descend(&join(path, child), depth + 1, Some(&entries), visitor, stats)?;
        }
        Ok(())
    }
}

fn skip(
    path: &str,
    depth: usize,
    reason: SkipReason,
    visitor: &mut dyn Visitor,
    stats: &mut WalkStats,
) {
    stats.skipped += 1;
    visitor.skip(&Skip {
        path: path.to_string(),
        depth,
        reason,
    });
}
