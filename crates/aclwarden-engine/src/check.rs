//! Pass/fail checks over path-pattern-scoped nodes.
//!
//! A check names a root, a path pattern, and an entry list. Every visited
//! node whose path matches the pattern must carry exactly those entries
//! (or, for a negated check, must *not* satisfy them). Each matching node
//! yields a [`CheckLine`]; the check's status is folded from its lines
//! after the walk.

use std::fmt;

use aclwarden_core::acl::{Entry, parse_entries};
use aclwarden_core::client::TreeClient;
use aclwarden_core::pattern::PathPattern;
use aclwarden_core::predicate::{exact_match, satisfy_all};
use aclwarden_core::Result;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditItem, Auditor, ItemOutcome};
use crate::walker::{Skip, Visitor, WalkNode};

/// A check as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDef {
    /// Report title
    pub title: String,
    /// Walk root
    pub root: String,
    /// Path pattern selecting the nodes to check
    pub path: String,
    /// Treat `path` as a raw regex instead of a glob
    #[serde(default)]
    pub regex: bool,
    /// Expected entries
    #[serde(default)]
    pub entries: Vec<String>,
    /// Pass when the entries are *not* satisfied
    #[serde(default)]
    pub negate: bool,
}

/// Aggregate result of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Every checked node passed (or none matched)
    Pass,
    /// At least one checked node failed
    Fail,
    /// The check could not run: bad definition or missing root
    Invalid(String),
    /// Evaluation was stopped by a comparison error
    Error(String),
}

impl CheckStatus {
    /// Only [`CheckStatus::Pass`] is a pass.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Invalid(reason) => write!(f, "INVALID: {reason}"),
            Self::Error(reason) => write!(f, "ERROR: {reason}"),
        }
    }
}

/// The check's verdict on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckLine {
    /// Node path
    pub path: String,
    /// Whether the node passed
    pub passed: bool,
    /// Node entries at visit time
    pub entries: Vec<Entry>,
}

/// Everything a check produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The check as defined
    pub check: CheckDef,
    /// One line per checked node, pre-order
    pub lines: Vec<CheckLine>,
    /// Nodes the walk could not visit
    pub skipped: Vec<Skip>,
    /// Why the check was dropped before the walk
    pub invalid: Option<String>,
    /// Why evaluation stopped during the walk
    pub error: Option<String>,
}

impl CheckOutcome {
    /// An outcome for a check that never ran.
    pub fn invalid(check: CheckDef, reason: impl Into<String>) -> Self {
        Self {
            check,
            lines: Vec::new(),
            skipped: Vec::new(),
            invalid: Some(reason.into()),
            error: None,
        }
    }

    /// Fold the lines into a status.
    ///
    /// One failing line fails the check for good; nothing after it can
    /// bring it back.
    pub fn status(&self) -> CheckStatus {
        if let Some(reason) = &self.invalid {
            return CheckStatus::Invalid(reason.clone());
        }
        if let Some(reason) = &self.error {
            return CheckStatus::Error(reason.clone());
        }
        if self.lines.iter().all(|line| line.passed) {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }

    /// Failing lines only.
    pub fn failures(&self) -> impl Iterator<Item = &CheckLine> {
        self.lines.iter().filter(|l| !l.passed)
    }
}

// ============================================================================
// CheckRun
// ============================================================================

/// Visitor evaluating one compiled check.
#[derive(Debug)]
pub struct CheckRun {
    pattern: PathPattern,
    required: Vec<Entry>,
    outcome: CheckOutcome,
}

impl CheckRun {
    /// Compile the path pattern and expected entries.
    pub fn new(check: CheckDef) -> Result<Self> {
        let pattern = PathPattern::new(&check.path, check.regex)?;
        let required = parse_entries(&check.entries)?;
        Ok(Self {
            pattern,
            required,
            outcome: CheckOutcome {
                check,
                lines: Vec::new(),
                skipped: Vec::new(),
                invalid: None,
                error: None,
            },
        })
    }

    /// The finished outcome.
    pub fn finish(self) -> CheckOutcome {
        self.outcome
    }

    fn evaluate(&self, entries: &[Entry]) -> Result<bool> {
        if self.outcome.check.negate {
            Ok(!satisfy_all(entries, &self.required)?)
        } else {
            Ok(exact_match(entries, &self.required))
        }
    }
}

impl Visitor for CheckRun {
    fn visit(&mut self, node: &WalkNode<'_>) -> Result<()> {
        if self.outcome.error.is_some() || !self.pattern.is_match(node.path) {
            return Ok(());
        }

        let passed = match self.evaluate(node.entries) {
            Ok(passed) => passed,
            Err(e) if e.is_recoverable() => {
                log::warn!(
                    "Check '{}' at {} stopped: {e}",
                    self.outcome.check.title,
                    node.path
                );
                self.outcome.error = Some(format!("{}: {e}", node.path));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if !passed {
            log::debug!("Check '{}' failed at {}", self.outcome.check.title, node.path);
        }
        self.outcome.lines.push(CheckLine {
            path: node.path.to_string(),
            passed,
            entries: node.entries.to_vec(),
        });
        Ok(())
    }

    fn skip(&mut self, skip: &Skip) {
        if self.outcome.error.is_none() {
            self.outcome.skipped.push(skip.clone());
        }
    }
}

/// Run a batch of checks, sharing one walk per distinct root.
///
/// Outcomes come back in input order. A check with a bad definition or a
/// missing root is reported as [`CheckStatus::Invalid`] without affecting
/// the others.
pub fn run_checks<C: TreeClient + ?Sized>(
    client: &C,
    checks: &[CheckDef],
) -> Result<Vec<CheckOutcome>> {
    let items: Vec<AuditItem> = checks.iter().cloned().map(AuditItem::Check).collect();
    let report = Auditor::new(client).run(&items)?;
    Ok(report
        .items
        .into_iter()
        .filter_map(|outcome| match outcome {
            ItemOutcome::Check(check) => Some(check),
            ItemOutcome::Query(_) => None,
        })
        .collect())
}
