//! The tree-client capability consumed by the engine.
//!
//! aclwarden never speaks the coordination service's wire protocol
//! itself. Anything that can list children and read/write entry lists
//! can be audited: a live session adapter, or the in-memory
//! [`MemoryTree`](crate::memory::MemoryTree).

use crate::acl::Entry;
use crate::{Error, Result};

/// Version precondition for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    /// Overwrite regardless of the node's current ACL version
    #[default]
    Any,
    /// Only write if the node's ACL version matches
    Exact(i32),
}

/// Blocking access to a hierarchical, ACL-protected namespace.
///
/// Errors follow the shared taxonomy: [`Error::Authorization`] when the
/// session may not read a node, [`Error::NotFound`] when it does not
/// exist, and [`Error::Transport`] for everything the session itself
/// cannot recover from.
pub trait TreeClient {
    /// Entry list of the node at `path`.
    fn get_entries(&self, path: &str) -> Result<Vec<Entry>>;

    /// Names (not paths) of the children of `path`, in service order.
    fn get_children(&self, path: &str) -> Result<Vec<String>>;

    /// Replace the entry list of `path`.
    fn set_entries(&self, path: &str, entries: &[Entry], version: Version) -> Result<()>;

    /// Whether `path` exists.
    ///
    /// An unreadable node exists; the walker will report it as skipped.
    fn exists(&self, path: &str) -> Result<bool> {
        match self.get_entries(path) {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(Error::Authorization { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }
}

impl<C: TreeClient + ?Sized> TreeClient for &C {
    fn get_entries(&self, path: &str) -> Result<Vec<Entry>> {
        (**self).get_entries(path)
    }

    fn get_children(&self, path: &str) -> Result<Vec<String>> {
        (**self).get_children(path)
    }

    fn set_entries(&self, path: &str, entries: &[Entry], version: Version) -> Result<()> {
        (**self).set_entries(path, entries, version)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }
}
