//! aclwarden Core: ACL model, comparison semantics, and predicates.
//!
//! This crate holds everything that can be decided about a single node
//! without walking the tree. It has no internal aclwarden dependencies
//! (dependency level 0).
//!
//! # Modules
//!
//! - [`acl`]: entries, schemes, and permission masks
//! - [`compare`]: equivalence and satisfaction between entries
//! - [`pattern`]: glob to regex translation
//! - [`predicate`]: predicate functions and the named registry
//! - [`path`]: node path validation and helpers
//! - [`client`]: the [`TreeClient`] capability
//! - [`memory`]: an in-memory [`TreeClient`] and JSON snapshots

#![forbid(unsafe_code)]

pub mod acl;
pub mod client;
pub mod compare;
pub mod error;
pub mod memory;
pub mod path;
pub mod pattern;
pub mod predicate;

// Re-export key types at crate root for convenience
pub use acl::{Entry, Perms, Scheme};
pub use client::{TreeClient, Version};
pub use error::{Error, Result};
pub use memory::{MemoryTree, Snapshot};
pub use predicate::{NodeContext, Predicate};
