//! Common fixtures for aclwarden engine integration tests.

use std::cell::Cell;

use aclwarden_core::acl::Entry;
use aclwarden_core::client::{TreeClient, Version};
use aclwarden_core::memory::MemoryTree;
use aclwarden_core::{Error, Result};

/// A small service tree:
///
/// ```text
/// /                 world:anyone:rwcda
/// /a                sasl:app:rwcda
/// /a/x              sasl:app:rwcda
/// /a/y              world:anyone:rwcda
/// /b                sasl:ops:rwcda
/// /b/secret         sasl:ops:r
/// /b/secret/deep    sasl:ops:r
/// /c                ip:10.0.0.0/8:r, world:anyone:r
/// /c/z              world:anyone:r, world:anyone:r
/// ```
pub fn fixture_tree() -> MemoryTree {
    let tree = MemoryTree::new();
    let nodes: &[(&str, &[&str])] = &[
        ("/a", &["sasl:app:rwcda"]),
        ("/a/x", &["sasl:app:rwcda"]),
        ("/a/y", &["world:anyone:rwcda"]),
        ("/b", &["sasl:ops:rwcda"]),
        ("/b/secret", &["sasl:ops:r"]),
        ("/b/secret/deep", &["sasl:ops:r"]),
        ("/c", &["ip:10.0.0.0/8:r", "world:anyone:r"]),
        ("/c/z", &["world:anyone:r", "world:anyone:r"]),
    ];
    for (path, entries) in nodes {
        tree.insert_str(path, entries).unwrap();
    }
    tree
}

/// Lists a child under `parent` that is gone by the time it is read.
pub struct PhantomChild {
    pub inner: MemoryTree,
    pub parent: &'static str,
    pub name: &'static str,
}

impl TreeClient for PhantomChild {
    fn get_entries(&self, path: &str) -> Result<Vec<Entry>> {
        self.inner.get_entries(path)
    }

    fn get_children(&self, path: &str) -> Result<Vec<String>> {
        let mut children = self.inner.get_children(path)?;
        if path == self.parent {
            children.push(self.name.to_string());
        }
        Ok(children)
    }

    fn set_entries(&self, path: &str, entries: &[Entry], version: Version) -> Result<()> {
        self.inner.set_entries(path, entries, version)
    }
}

/// Loses its session after a fixed number of successful writes.
pub struct FlakyWriter {
    pub inner: MemoryTree,
    pub writes_left: Cell<usize>,
}

impl FlakyWriter {
    pub fn new(inner: MemoryTree, writes: usize) -> Self {
        Self {
            inner,
            writes_left: Cell::new(writes),
        }
    }
}

impl TreeClient for FlakyWriter {
    fn get_entries(&self, path: &str) -> Result<Vec<Entry>> {
        self.inner.get_entries(path)
    }

    fn get_children(&self, path: &str) -> Result<Vec<String>> {
        self.inner.get_children(path)
    }

    fn set_entries(&self, path: &str, entries: &[Entry], version: Version) -> Result<()> {
        let left = self.writes_left.get();
        if left == 0 {
            return Err(Error::transport("session expired"));
        }
        self.writes_left.set(left - 1);
        self.inner.set_entries(path, entries, version)
    }
}
