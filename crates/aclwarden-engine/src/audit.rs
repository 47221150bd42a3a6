//! Audit orchestration: many queries and checks, one walk per root.
//!
//! Items are compiled and validated individually, grouped by root path,
//! and each group is evaluated in a single walk with every item's visitor
//! attached. Outcomes are buffered under the item's [`ItemKey`] and read
//! back in the caller's order, so grouping never shows in the report.
//!
//! ```rust
//! use aclwarden_core::memory::MemoryTree;
//! use aclwarden_engine::audit::{AuditItem, Auditor};
//! use aclwarden_engine::query::QueryDef;
//!
//! let tree = MemoryTree::new();
//! tree.insert_str("/a/x", &["world:anyone:cdrwa"]).unwrap();
//! tree.insert_str("/b", &["sasl:svc:r"]).unwrap();
//!
//! let items = vec![
//!     AuditItem::Query(QueryDef::new("open", "/a", &[])),
//!     AuditItem::Query(QueryDef::new("duplicates", "/b", &[])),
//!     AuditItem::Query(QueryDef::new("all", "/a", &[])),
//! ];
//! let report = Auditor::new(&tree).run(&items).unwrap();
//! assert_eq!(report.items.len(), 3);
//! assert_eq!(report.traversals, 2);
//! ```

use std::collections::{BTreeMap, HashMap};

use aclwarden_core::client::TreeClient;
use aclwarden_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::check::{CheckDef, CheckOutcome, CheckRun};
use crate::query::{QueryDef, QueryOutcome, QueryRun, check_root, run_query};
use crate::walker::{Fanout, Visitor, WalkStats, Walker};

/// A query or a check to run as part of an audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditItem {
    /// A named predicate
    Query(QueryDef),
    /// A pass/fail check
    Check(CheckDef),
}

impl AuditItem {
    /// Root path the item walks from.
    pub fn root(&self) -> &str {
        match self {
            AuditItem::Query(q) => &q.root,
            AuditItem::Check(c) => &c.root,
        }
    }

    fn dropped(&self, reason: String) -> ItemOutcome {
        match self {
            AuditItem::Query(q) => ItemOutcome::Query(QueryOutcome::dropped(q.clone(), reason)),
            AuditItem::Check(c) => ItemOutcome::Check(CheckOutcome::invalid(c.clone(), reason)),
        }
    }
}

/// Buffer key of an item: its position in the caller's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(usize);

impl ItemKey {
    /// Position in the caller's item list.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Outcome of one audit item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Outcome of a query item
    Query(QueryOutcome),
    /// Outcome of a check item
    Check(CheckOutcome),
}

/// Outcomes in item order, plus walk accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// One outcome per item, in the caller's order
    pub items: Vec<ItemOutcome>,
    /// Number of walks performed
    pub traversals: usize,
    /// Combined walk counters
    pub stats: WalkStats,
}

impl AuditReport {
    /// Check outcomes only, in item order.
    pub fn checks(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.items.iter().filter_map(|o| match o {
            ItemOutcome::Check(c) => Some(c),
            ItemOutcome::Query(_) => None,
        })
    }

    /// True when every check passed.
    pub fn all_checks_pass(&self) -> bool {
        self.checks().all(|c| c.status().is_pass())
    }
}

enum Evaluator {
    Query(QueryRun),
    Check(CheckRun),
}

impl Evaluator {
    fn compile(item: &AuditItem) -> Result<Self> {
        Ok(match item {
            AuditItem::Query(q) => Evaluator::Query(QueryRun::new(q.clone())?),
            AuditItem::Check(c) => Evaluator::Check(CheckRun::new(c.clone())?),
        })
    }

    fn visitor(&mut self) -> &mut dyn Visitor {
        match self {
            Evaluator::Query(run) => run,
            Evaluator::Check(run) => run,
        }
    }

    fn finish(self) -> ItemOutcome {
        match self {
            Evaluator::Query(run) => ItemOutcome::Query(run.finish()),
            Evaluator::Check(run) => ItemOutcome::Check(run.finish()),
        }
    }
}

// ============================================================================
// Auditor
// ============================================================================

/// Runs batches of audit items against a tree client.
pub struct Auditor<'c, C: ?Sized> {
    client: &'c C,
}

impl<'c, C: TreeClient + ?Sized> Auditor<'c, C> {
    /// Audit through `client`.
    pub fn new(client: &'c C) -> Self {
        Self { client }
    }

    fn prepare(&self, item: &AuditItem) -> Result<Evaluator> {
        let evaluator = Evaluator::compile(item)?;
        check_root(self.client, item.root())?;
        Ok(evaluator)
    }

    /// Run every item, one walk per distinct root.
    ///
    /// Items that fail to compile, or whose root is invalid or missing,
    /// are reported as dropped. Only run-fatal errors (transport and the
    /// like) are returned.
    pub fn run(&self, items: &[AuditItem]) -> Result<AuditReport> {
        let mut buffers: HashMap<ItemKey, ItemOutcome> = HashMap::with_capacity(items.len());
        let mut groups: BTreeMap<&str, Vec<(ItemKey, &AuditItem, Evaluator)>> = BTreeMap::new();

        for (index, item) in items.iter().enumerate() {
            let key = ItemKey(index);
            match self.prepare(item) {
                Ok(evaluator) => groups
                    .entry(item.root())
                    .or_default()
                    .push((key, item, evaluator)),
                Err(e) if e.is_recoverable() => {
                    log::warn!("Dropping audit item {index} at {}: {e}", item.root());
                    buffers.insert(key, item.dropped(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        let mut traversals = 0;
        let mut stats = WalkStats::default();
        for (root, mut group) in groups {
            log::info!("Auditing {root} ({} items)", group.len());
            let walked = {
                let visitors: Vec<&mut dyn Visitor> =
                    group.iter_mut().map(|(_, _, ev)| ev.visitor()).collect();
                let mut fanout = Fanout::new(visitors);
                Walker::new(self.client).walk(root, &mut fanout)
            };
            traversals += 1;

            match walked {
                Ok(walk_stats) => {
                    stats += walk_stats;
                    for (key, _, evaluator) in group {
                        buffers.insert(key, evaluator.finish());
                    }
                }
                // root removed between validation and walk
                Err(Error::NotFound { .. }) => {
                    log::warn!("Root {root} vanished before its walk");
                    for (key, item, _) in group {
                        buffers.insert(key, item.dropped(Error::not_found(root).to_string()));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let outcomes = (0..items.len())
            .map(|index| {
                buffers.remove(&ItemKey(index)).ok_or_else(|| {
                    Error::validation(format!("no outcome recorded for audit item {index}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AuditReport {
            items: outcomes,
            traversals,
            stats,
        })
    }

    /// List every reachable node and its entries, walking from `/`.
    pub fn inventory(&self) -> Result<QueryOutcome> {
        run_query(self.client, &QueryDef::inventory())
    }
}
