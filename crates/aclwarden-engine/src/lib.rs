//! aclwarden Engine: tree walking and the query, check, and enforce runs
//! built on it.
//!
//! Everything here talks to the tree through
//! [`TreeClient`](aclwarden_core::TreeClient) and is synchronous: one
//! `get_entries` and one `get_children` per visited node (dependency
//! level 1).
//!
//! # Modules
//!
//! - [`walker`]: authorization-pruning pre-order walk and visitors
//! - [`query`]: named predicate runs
//! - [`check`]: pass/fail checks
//! - [`audit`]: batches of queries and checks, one walk per root
//! - [`enforce`]: policy writes, dry-run or live
//! - [`rollback`]: pre-write records and their replay
//! - [`export`]: subtree snapshots

#![forbid(unsafe_code)]

pub mod audit;
pub mod check;
pub mod enforce;
pub mod export;
pub mod query;
pub mod rollback;
pub mod walker;

// Re-export key types at crate root for convenience
pub use audit::{AuditItem, AuditReport, Auditor, ItemOutcome};
pub use check::{CheckDef, CheckOutcome, CheckStatus, run_checks};
pub use enforce::{EnforceMode, EnforceOutcome, Enforcer, Policy};
pub use export::export;
pub use query::{QueryDef, QueryOutcome, run_query};
pub use rollback::{RollbackRecord, RollbackSink, restore};
pub use walker::{Skip, SkipReason, Visitor, WalkStats, Walker};
