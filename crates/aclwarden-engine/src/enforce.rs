//! Policy enforcement: write an entry list onto every node a query matches.
//!
//! A dry run walks the policy's query exactly like a listing and reports
//! the changes it would make. A live run writes each matching node as it
//! is visited, handing the node's previous entries to a
//! [`RollbackSink`] first.

use std::fmt;

use aclwarden_core::acl::{Entry, parse_entries};
use aclwarden_core::client::{TreeClient, Version};
use aclwarden_core::predicate::Predicate;
use aclwarden_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::query::{QueryDef, QueryRun, check_root};
use crate::rollback::{RollbackRecord, RollbackSink};
use crate::walker::{Skip, SkipReason, Visitor, WalkNode, Walker};

/// An enforcement policy as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Report title
    pub title: String,
    /// Selects the nodes to write
    pub query: QueryDef,
    /// Keep existing entries and add the policy's after them
    #[serde(default)]
    pub append: bool,
    /// Entries to write
    pub entries: Vec<String>,
}

impl Policy {
    fn target(&self, policy_entries: &[Entry], existing: &[Entry]) -> Vec<Entry> {
        let mut target = if self.append {
            existing.to_vec()
        } else {
            Vec::new()
        };
        target.extend_from_slice(policy_entries);
        target
    }
}

/// Whether enforcement writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforceMode {
    /// Report what would change
    #[default]
    DryRun,
    /// Write the changes
    Live,
}

impl fmt::Display for EnforceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// One node's entries before and after enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Node path
    pub path: String,
    /// Entries found on the node
    pub before: Vec<Entry>,
    /// Entries written (or that would be written)
    pub after: Vec<Entry>,
}

/// Result of enforcing one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnforceOutcome {
    /// The policy as defined
    pub policy: Policy,
    /// Mode the policy ran in
    pub mode: EnforceMode,
    /// Planned (dry run) or performed (live) changes, pre-order
    pub changes: Vec<Change>,
    /// Nodes that could not be visited or written
    pub skipped: Vec<Skip>,
    /// Why the policy was dropped or stopped, if it was
    pub error: Option<String>,
}

impl EnforceOutcome {
    fn new(policy: Policy, mode: EnforceMode) -> Self {
        Self {
            policy,
            mode,
            changes: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }

    /// An outcome for a policy that never ran.
    pub fn dropped(policy: Policy, mode: EnforceMode, reason: impl Into<String>) -> Self {
        let mut outcome = Self::new(policy, mode);
        outcome.error = Some(reason.into());
        outcome
    }

    /// Paths the policy matched.
    pub fn matched_paths(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }
}

// ============================================================================
// Live visitor
// ============================================================================

struct Apply<'a, C: ?Sized> {
    client: &'a C,
    sink: &'a mut dyn RollbackSink,
    predicate: Predicate,
    entries: Vec<Entry>,
    outcome: EnforceOutcome,
}

impl<C: TreeClient + ?Sized> Visitor for Apply<'_, C> {
    fn visit(&mut self, node: &WalkNode<'_>) -> Result<()> {
        if self.outcome.error.is_some() {
            return Ok(());
        }

        let matched = match self.predicate.evaluate(&node.context()) {
            Ok(matched) => matched,
            Err(e) if e.is_recoverable() => {
                log::warn!(
                    "Policy '{}' at {} stopped: {e}",
                    self.outcome.policy.title,
                    node.path
                );
                self.outcome.error = Some(format!("{}: {e}", node.path));
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if !matched {
            return Ok(());
        }

        let after = self.outcome.policy.target(&self.entries, node.entries);
        self.sink
            .record(RollbackRecord::new(node.path, node.entries.to_vec()))?;

        match self.client.set_entries(node.path, &after, Version::Any) {
            Ok(()) => {
                log::info!(
                    "Policy '{}' set {} to [{}]",
                    self.outcome.policy.title,
                    node.path,
                    join_entries(&after)
                );
                self.outcome.changes.push(Change {
                    path: node.path.to_string(),
                    before: node.entries.to_vec(),
                    after,
                });
                Ok(())
            }
            Err(Error::NotFound { .. }) => {
                log::warn!("Cannot write {}: node vanished", node.path);
                self.outcome.skipped.push(Skip {
                    path: node.path.to_string(),
                    depth: node.depth,
                    reason: SkipReason::Vanished,
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn skip(&mut self, skip: &Skip) {
        if self.outcome.error.is_none() {
            self.outcome.skipped.push(skip.clone());
        }
    }
}

fn join_entries(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(Entry::canonical)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Enforcer
// ============================================================================

/// Applies policies through a tree client.
pub struct Enforcer<'c, C: ?Sized> {
    client: &'c C,
    mode: EnforceMode,
}

impl<'c, C: TreeClient + ?Sized> Enforcer<'c, C> {
    /// Enforce through `client` in `mode`.
    pub fn new(client: &'c C, mode: EnforceMode) -> Self {
        Self { client, mode }
    }

    /// The mode this enforcer runs in.
    pub fn mode(&self) -> EnforceMode {
        self.mode
    }

    /// Enforce one policy.
    ///
    /// A bad definition or missing root is returned as an error before
    /// anything is written. Once writing has started, a transport failure
    /// aborts the policy; writes already made stay in place and their
    /// rollback records are already in `sink`.
    pub fn enforce(&self, policy: &Policy, sink: &mut dyn RollbackSink) -> Result<EnforceOutcome> {
        let entries = parse_entries(&policy.entries)?;
        let root = &policy.query.root;

        match self.mode {
            EnforceMode::DryRun => {
                let mut run = QueryRun::new(policy.query.clone())?;
                check_root(self.client, root)?;
                Walker::new(self.client).walk(root, &mut run)?;
                let listed = run.finish();

                let mut outcome = EnforceOutcome::new(policy.clone(), self.mode);
                outcome.changes = listed
                    .matches()
                    .map(|m| Change {
                        path: m.path.clone(),
                        before: m.entries.clone(),
                        after: policy.target(&entries, &m.entries),
                    })
                    .collect();
                outcome.skipped = listed.skipped().cloned().collect();
                outcome.error = listed.error;
                Ok(outcome)
            }
            EnforceMode::Live => {
                let predicate = Predicate::compile(&policy.query.name, &policy.query.args)?;
                check_root(self.client, root)?;
                log::info!("Enforcing '{}' from {root}", policy.title);

                let mut apply = Apply {
                    client: self.client,
                    sink,
                    predicate,
                    entries,
                    outcome: EnforceOutcome::new(policy.clone(), self.mode),
                };
                Walker::new(self.client).walk(root, &mut apply)?;
                Ok(apply.outcome)
            }
        }
    }

    /// Enforce policies in order.
    ///
    /// Policies that fail with a recoverable error are reported as dropped
    /// and the rest still run; a fatal error stops the batch.
    pub fn enforce_all(
        &self,
        policies: &[Policy],
        sink: &mut dyn RollbackSink,
    ) -> Result<Vec<EnforceOutcome>> {
        let mut outcomes = Vec::with_capacity(policies.len());
        for policy in policies {
            match self.enforce(policy, sink) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_recoverable() => {
                    log::warn!("Dropping policy '{}': {e}", policy.title);
                    outcomes.push(EnforceOutcome::dropped(
                        policy.clone(),
                        self.mode,
                        e.to_string(),
                    ));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }
}
