//! Text rendering of query, check, audit, and enforce results.
//!
//! Every renderer returns a `String` so output can be compared in tests.
//! Output is deterministic: walk order, no timestamps. Color is applied
//! only when [`RenderOptions::color`] is set.

use std::fmt::Write as _;

use aclwarden_core::acl::Entry;
use aclwarden_core::predicate::registry;
use aclwarden_engine::audit::{AuditReport, ItemOutcome};
use aclwarden_engine::check::{CheckOutcome, CheckStatus};
use aclwarden_engine::enforce::{EnforceMode, EnforceOutcome};
use aclwarden_engine::query::{QueryEvent, QueryOutcome};
use aclwarden_engine::rollback::RestoreSummary;
use aclwarden_engine::walker::Skip;
use colored::Colorize;

/// How to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit ANSI colors
    pub color: bool,
}

#[derive(Clone, Copy)]
enum Tone {
    Good,
    Bad,
    Warn,
    Dim,
    Title,
}

impl RenderOptions {
    fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Good => text.green().to_string(),
            Tone::Bad => text.red().bold().to_string(),
            Tone::Warn => text.yellow().to_string(),
            Tone::Dim => text.dimmed().to_string(),
            Tone::Title => text.bold().to_string(),
        }
    }

    fn status(&self, status: &CheckStatus) -> String {
        let label = format!("[{status}]");
        match status {
            CheckStatus::Pass => self.paint(&label, Tone::Good),
            CheckStatus::Fail => self.paint(&label, Tone::Bad),
            CheckStatus::Invalid(_) | CheckStatus::Error(_) => self.paint(&label, Tone::Warn),
        }
    }
}

fn entry_list(entries: &[Entry]) -> String {
    let joined = entries
        .iter()
        .map(Entry::canonical)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn skip_line(out: &mut String, opts: &RenderOptions, skip: &Skip, prefix: &str) {
    let _ = writeln!(
        out,
        "{prefix}{}",
        opts.paint(&format!("{} (skipped: {})", skip.path, skip.reason), Tone::Warn)
    );
}

// ============================================================================
// Queries
// ============================================================================

/// Render a query as an indented tree (every visited node, matches
/// marked `*`) or as a flat list of matches.
pub fn render_query(outcome: &QueryOutcome, opts: &RenderOptions, list: bool) -> String {
    let mut out = String::new();
    for event in &outcome.events {
        match event {
            QueryEvent::Node(node) if list => {
                if node.matched {
                    let _ = writeln!(out, "{} {}", node.path, entry_list(&node.entries));
                }
            }
            QueryEvent::Node(node) => {
                let line = format!("{} {}", node.path, entry_list(&node.entries));
                let line = if node.matched {
                    opts.paint(&format!("* {line}"), Tone::Good)
                } else {
                    opts.paint(&format!("  {line}"), Tone::Dim)
                };
                let _ = writeln!(out, "{}{line}", indent(node.depth));
            }
            QueryEvent::Skipped(skip) if list => skip_line(&mut out, opts, skip, ""),
            QueryEvent::Skipped(skip) => {
                skip_line(&mut out, opts, skip, &format!("{}  ", indent(skip.depth)));
            }
        }
    }
    if let Some(error) = &outcome.error {
        let _ = writeln!(out, "{}", opts.paint(&format!("error: {error}"), Tone::Bad));
    }
    out
}

/// Render an inventory: every reachable node and its entries.
pub fn render_inventory(outcome: &QueryOutcome, opts: &RenderOptions) -> String {
    let mut out = String::new();
    for event in &outcome.events {
        match event {
            QueryEvent::Node(node) => {
                let _ = writeln!(out, "{} {}", node.path, entry_list(&node.entries));
            }
            QueryEvent::Skipped(skip) => skip_line(&mut out, opts, skip, ""),
        }
    }
    out
}

// ============================================================================
// Checks and audits
// ============================================================================

/// Render one check: status line, then every checked node (entries shown
/// on failure) and every skipped node.
///
/// When part of the tree was unreadable the status line carries the counts,
/// so a pass over nothing is not mistaken for a clean result.
pub fn render_check(outcome: &CheckOutcome, opts: &RenderOptions) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{} {}",
        opts.status(&outcome.status()),
        outcome.check.title
    );
    if !outcome.skipped.is_empty() {
        let _ = write!(
            out,
            " ({} checked, {} skipped)",
            outcome.lines.len(),
            outcome.skipped.len()
        );
    }
    out.push('\n');

    for line in &outcome.lines {
        if line.passed {
            let _ = writeln!(out, "    {} {}", opts.paint("ok", Tone::Good), line.path);
        } else {
            let _ = writeln!(
                out,
                "    {} {} {}",
                opts.paint("FAIL", Tone::Bad),
                opts.paint(&line.path, Tone::Bad),
                entry_list(&line.entries)
            );
        }
    }
    for skip in &outcome.skipped {
        skip_line(&mut out, opts, skip, "    ");
    }
    out
}

/// Render a batch of checks followed by a pass count.
pub fn render_checks(outcomes: &[CheckOutcome], opts: &RenderOptions) -> String {
    let mut out: String = outcomes.iter().map(|o| render_check(o, opts)).collect();
    let passed = outcomes.iter().filter(|o| o.status().is_pass()).count();
    let _ = writeln!(out, "{passed}/{} checks passed", outcomes.len());
    out
}

/// Render an audit: each item in order, then walk totals.
pub fn render_audit(report: &AuditReport, opts: &RenderOptions) -> String {
    let mut out = String::new();
    for item in &report.items {
        match item {
            ItemOutcome::Query(query) => {
                let heading = format!(
                    "== query {} {} ({} matched)",
                    query.query.name,
                    query.query.root,
                    query.matches().count()
                );
                let _ = writeln!(out, "{}", opts.paint(&heading, Tone::Title));
                out.push_str(&render_query(query, opts, true));
            }
            ItemOutcome::Check(check) => {
                out.push_str("== check ");
                out.push_str(&render_check(check, opts));
            }
        }
    }
    let _ = writeln!(
        out,
        "{} traversals, {} nodes visited, {} skipped",
        report.traversals, report.stats.visited, report.stats.skipped
    );
    out
}

// ============================================================================
// Enforcement
// ============================================================================

/// Render enforcement outcomes, one block per policy.
pub fn render_enforce(outcomes: &[EnforceOutcome], opts: &RenderOptions) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        let verb = match outcome.mode {
            EnforceMode::DryRun => "would change",
            EnforceMode::Live => "changed",
        };
        let heading = format!(
            "[{}] {}: {verb} {} nodes",
            outcome.mode,
            outcome.policy.title,
            outcome.changes.len()
        );
        let _ = writeln!(out, "{}", opts.paint(&heading, Tone::Title));
        for change in &outcome.changes {
            let _ = writeln!(
                out,
                "    {} {} -> {}",
                change.path,
                opts.paint(&entry_list(&change.before), Tone::Dim),
                opts.paint(&entry_list(&change.after), Tone::Good)
            );
        }
        for skip in &outcome.skipped {
            skip_line(&mut out, opts, skip, "    ");
        }
        if let Some(error) = &outcome.error {
            let _ = writeln!(out, "    {}", opts.paint(&format!("error: {error}"), Tone::Bad));
        }
    }
    out
}

/// Render a restore summary.
pub fn render_restore(summary: &RestoreSummary, opts: &RenderOptions) -> String {
    let mut out = format!("restored {} nodes\n", summary.restored);
    for path in &summary.missing {
        let _ = writeln!(
            out,
            "    {}",
            opts.paint(&format!("{path} (no longer exists)"), Tone::Warn)
        );
    }
    out
}

// ============================================================================
// Predicates
// ============================================================================

/// Render the predicate registry.
pub fn render_predicates(opts: &RenderOptions) -> String {
    let mut out = String::new();
    for registration in registry() {
        let signature = format!("{} {}", registration.name, registration.usage);
        let _ = writeln!(
            out,
            "{:<24} {}",
            opts.paint(signature.trim_end(), Tone::Title),
            registration.summary
        );
    }
    out
}
