//! Named queries: one predicate evaluated over a subtree.

use aclwarden_core::acl::Entry;
use aclwarden_core::client::TreeClient;
use aclwarden_core::path::{ROOT, validate_path};
use aclwarden_core::predicate::Predicate;
use aclwarden_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::walker::{Skip, Visitor, WalkNode, Walker};

/// A named predicate applied below a root path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDef {
    /// Registered predicate name
    pub name: String,
    /// Walk root
    pub root: String,
    /// Predicate arguments (entries or patterns)
    #[serde(default)]
    pub args: Vec<String>,
}

impl QueryDef {
    /// Build a definition.
    pub fn new(name: impl Into<String>, root: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The whole-tree listing used for inventories.
    pub fn inventory() -> Self {
        Self::new("all", ROOT, &[])
    }
}

/// Predicate result for one visited node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeMatch {
    /// Node path
    pub path: String,
    /// Distance from the query root
    pub depth: usize,
    /// Whether the predicate held
    pub matched: bool,
    /// Node entries at visit time
    pub entries: Vec<Entry>,
}

/// One line of a query walk, in visit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueryEvent {
    /// A visited node
    Node(NodeMatch),
    /// A node that could not be visited
    Skipped(Skip),
}

/// Everything a query walk produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    /// The query as defined
    pub query: QueryDef,
    /// Visited and skipped nodes, pre-order
    pub events: Vec<QueryEvent>,
    /// Why the query was dropped, if it was
    pub error: Option<String>,
}

impl QueryOutcome {
    /// An outcome for a query that never ran.
    pub fn dropped(query: QueryDef, reason: impl Into<String>) -> Self {
        Self {
            query,
            events: Vec::new(),
            error: Some(reason.into()),
        }
    }

    /// Visited nodes where the predicate held.
    pub fn matches(&self) -> impl Iterator<Item = &NodeMatch> {
        self.events.iter().filter_map(|e| match e {
            QueryEvent::Node(m) if m.matched => Some(m),
            _ => None,
        })
    }

    /// Paths of [`matches`](Self::matches).
    pub fn matched_paths(&self) -> Vec<&str> {
        self.matches().map(|m| m.path.as_str()).collect()
    }

    /// Nodes that could not be visited.
    pub fn skipped(&self) -> impl Iterator<Item = &Skip> {
        self.events.iter().filter_map(|e| match e {
            QueryEvent::Skipped(s) => Some(s),
            QueryEvent::Node(_) => None,
        })
    }
}

// ============================================================================
// QueryRun
// ============================================================================

/// Visitor evaluating one compiled query.
///
/// An evaluation error that only concerns this query (such as a subnet
/// comparison against a malformed address) is recorded on the outcome and
/// stops further evaluation; the walk itself carries on for other visitors.
#[derive(Debug)]
pub struct QueryRun {
    predicate: Predicate,
    outcome: QueryOutcome,
}

impl QueryRun {
    /// Compile `query`; fails on unknown predicates or bad arguments.
    pub fn new(query: QueryDef) -> Result<Self> {
        let predicate = Predicate::compile(&query.name, &query.args)?;
        Ok(Self {
            predicate,
            outcome: QueryOutcome {
                query,
                events: Vec::new(),
                error: None,
            },
        })
    }

    /// The finished outcome.
    pub fn finish(self) -> QueryOutcome {
        self.outcome
    }
}

impl Visitor for QueryRun {
    fn visit(&mut self, node: &WalkNode<'_>) -> Result<()> {
        if self.outcome.error.is_some() {
            return Ok(());
        }

        let matched = match self.predicate.evaluate(&node.context()) {
            Ok(matched) => matched,
            Err(e) if e.is_recoverable() => {
                log::warn!(
                    "Query '{}' at {} stopped: {e}",
                    self.outcome.query.name,
                    node.path
                );
                self.outcome.error = Some(format!("{}: {e}", node.path));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.outcome.events.push(QueryEvent::Node(NodeMatch {
            path: node.path.to_string(),
            depth: node.depth,
            matched,
            entries: node.entries.to_vec(),
        }));
        Ok(())
    }

    fn skip(&mut self, skip: &Skip) {
        if self.outcome.error.is_none() {
            self.outcome.events.push(QueryEvent::Skipped(skip.clone()));
        }
    }
}

/// Check that a root is well formed and present.
pub(crate) fn check_root<C: TreeClient + ?Sized>(client: &C, root: &str) -> Result<()> {
    validate_path(root)?;
    if !client.exists(root)? {
        return Err(Error::not_found(root));
    }
    Ok(())
}

/// Run a single query in its own walk.
///
/// Compile errors and a missing root are returned as errors; use the
/// [`Auditor`](crate::audit::Auditor) to contain them per item.
pub fn run_query<C: TreeClient + ?Sized>(client: &C, query: &QueryDef) -> Result<QueryOutcome> {
    let mut run = QueryRun::new(query.clone())?;
    check_root(client, &query.root)?;
    Walker::new(client).walk(&query.root, &mut run)?;
    Ok(run.finish())
}
