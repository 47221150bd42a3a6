//! Command implementations.
//!
//! Each command returns its report text and whether it succeeded; `main`
//! prints the text and maps success to the exit code.

use std::path::{Path, PathBuf};

use aclwarden_core::memory::{MemoryTree, Snapshot};
use aclwarden_engine::audit::{AuditItem, Auditor};
use aclwarden_engine::check::run_checks;
use aclwarden_engine::enforce::{EnforceMode, Enforcer};
use aclwarden_engine::export::export;
use aclwarden_engine::query::{QueryDef, run_query};
use aclwarden_engine::rollback::{RollbackRecord, restore};

use crate::cli::{Cli, Command, RollbackAction};
use crate::config::AuditConfig;
use crate::config_handlers::handle_config_command;
use crate::error::{Error, Result};
use crate::report::{
    RenderOptions, render_audit, render_checks, render_enforce, render_inventory,
    render_predicates, render_query, render_restore,
};
use crate::store::RollbackStore;

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Report text for stdout
    pub text: String,
    /// False when the command should exit non-zero
    pub success: bool,
}

impl Output {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }
}

/// Loaded configuration plus global flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Parsed config file
    pub config: AuditConfig,
    /// `--snapshot`, if given
    pub snapshot: Option<PathBuf>,
    /// Rendering settings after `--no-color`
    pub render: RenderOptions,
}

impl Context {
    /// Build a context from a config and the global flags.
    pub fn new(config: AuditConfig, snapshot: Option<PathBuf>, no_color: bool) -> Self {
        let render = RenderOptions {
            color: config.settings.color && !no_color,
        };
        Self {
            config,
            snapshot,
            render,
        }
    }

    fn snapshot_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.snapshot {
            return Ok(path.clone());
        }
        match &self.config.settings.snapshot {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).as_ref())),
            None => Err(Error::config(
                "No tree to work on: pass --snapshot or set settings.snapshot",
            )),
        }
    }

    fn open_tree(&self) -> Result<(MemoryTree, PathBuf)> {
        let path = self.snapshot_path()?;
        let snapshot = Snapshot::load(&path).map_err(|e| match e {
            aclwarden_core::Error::Io(source) => Error::io_with_path(source, &path),
            other => Error::Core(other),
        })?;
        let tree = MemoryTree::from_snapshot(&snapshot)?;
        log::debug!("Loaded {} nodes from {}", snapshot.nodes.len(), path.display());
        Ok((tree, path))
    }

    fn rollback_store(&self) -> Result<RollbackStore> {
        Ok(RollbackStore::new(self.config.settings.rollback_path()?))
    }
}

fn save_tree(tree: &MemoryTree, path: &Path) -> Result<()> {
    tree.to_snapshot().save(path)?;
    log::info!("Wrote tree back to {}", path.display());
    Ok(())
}

// ============================================================================
// Dispatch
// ============================================================================

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<Output> {
    match cli.command {
        Command::Config { action } => {
            handle_config_command(cli.config.as_deref(), action)?;
            Ok(Output::ok(String::new()))
        }
        command => {
            let config = AuditConfig::load(cli.config.as_deref())?;
            let ctx = Context::new(config, cli.snapshot, cli.no_color);
            execute(&ctx, command)
        }
    }
}

/// Run a command against a loaded context.
pub fn execute(ctx: &Context, command: Command) -> Result<Output> {
    match command {
        Command::Query {
            name,
            root,
            args,
            list,
        } => cmd_query(ctx, QueryDef { name, root, args }, list),
        Command::Inventory => cmd_inventory(ctx),
        Command::Check => cmd_check(ctx),
        Command::Audit => cmd_audit(ctx),
        Command::Enforce { live, write_back } => cmd_enforce(ctx, live, write_back),
        Command::Rollback { action } => cmd_rollback(ctx, action),
        Command::Export { out, root } => cmd_export(ctx, &out, &root),
        Command::Predicates => Ok(Output::ok(render_predicates(&ctx.render))),
        Command::Config { .. } => Err(Error::config("config commands do not take a tree")),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_query(ctx: &Context, query: QueryDef, list: bool) -> Result<Output> {
    let (tree, _) = ctx.open_tree()?;
    let outcome = run_query(&tree, &query)?;
    Ok(Output {
        text: render_query(&outcome, &ctx.render, list),
        success: outcome.error.is_none(),
    })
}

fn cmd_inventory(ctx: &Context) -> Result<Output> {
    let (tree, _) = ctx.open_tree()?;
    let outcome = Auditor::new(&tree).inventory()?;
    Ok(Output::ok(render_inventory(&outcome, &ctx.render)))
}

fn cmd_check(ctx: &Context) -> Result<Output> {
    let (tree, _) = ctx.open_tree()?;
    let outcomes = run_checks(&tree, &ctx.config.checks)?;
    Ok(Output {
        text: render_checks(&outcomes, &ctx.render),
        success: outcomes.iter().all(|o| o.status().is_pass()),
    })
}

fn cmd_audit(ctx: &Context) -> Result<Output> {
    let (tree, _) = ctx.open_tree()?;
    let items: Vec<AuditItem> = ctx
        .config
        .queries
        .iter()
        .cloned()
        .map(AuditItem::Query)
        .chain(ctx.config.checks.iter().cloned().map(AuditItem::Check))
        .collect();
    let report = Auditor::new(&tree).run(&items)?;
    Ok(Output {
        text: render_audit(&report, &ctx.render),
        success: report.all_checks_pass(),
    })
}

fn cmd_enforce(ctx: &Context, live: bool, write_back: bool) -> Result<Output> {
    let (tree, snapshot_path) = ctx.open_tree()?;
    let policies = &ctx.config.policies;

    if !live {
        let mut discard: Vec<RollbackRecord> = Vec::new();
        let outcomes = Enforcer::new(&tree, EnforceMode::DryRun).enforce_all(policies, &mut discard)?;
        return Ok(Output::ok(render_enforce(&outcomes, &ctx.render)));
    }

    let store = ctx.rollback_store()?;
    let mut writer = store.create()?;
    let outcomes = Enforcer::new(&tree, EnforceMode::Live)
        .enforce_all(policies, &mut writer)
        .inspect_err(|e| {
            log::error!(
                "Enforcement aborted: {e}; {} rollback records in {}",
                writer.written(),
                writer.path().display()
            );
        })?;

    if write_back {
        save_tree(&tree, &snapshot_path)?;
    }

    let mut text = render_enforce(&outcomes, &ctx.render);
    text.push_str(&format!(
        "rollback: {} ({} records)\n",
        writer.path().display(),
        writer.written()
    ));
    let purged = store.purge(ctx.config.settings.rollback_keep)?;
    if !purged.is_empty() {
        log::info!("Purged {} old rollback files", purged.len());
    }

    Ok(Output {
        text,
        success: outcomes.iter().all(|o| o.error.is_none()),
    })
}

fn cmd_rollback(ctx: &Context, action: RollbackAction) -> Result<Output> {
    match action {
        RollbackAction::Apply { file, write_back } => {
            let records = RollbackStore::load(&file)?;
            let (tree, snapshot_path) = ctx.open_tree()?;
            let summary = restore(&tree, &records)?;
            if write_back {
                save_tree(&tree, &snapshot_path)?;
            }
            Ok(Output::ok(render_restore(&summary, &ctx.render)))
        }
        RollbackAction::List => {
            let text = ctx
                .rollback_store()?
                .list()?
                .iter()
                .map(|p| format!("{}\n", p.display()))
                .collect();
            Ok(Output::ok(text))
        }
        RollbackAction::Purge { keep } => {
            let keep = keep.unwrap_or(ctx.config.settings.rollback_keep);
            let text = ctx
                .rollback_store()?
                .purge(keep)?
                .iter()
                .map(|p| format!("removed {}\n", p.display()))
                .collect();
            Ok(Output::ok(text))
        }
    }
}

fn cmd_export(ctx: &Context, out: &Path, root: &str) -> Result<Output> {
    let (tree, _) = ctx.open_tree()?;
    let (snapshot, stats) = export(&tree, root)?;
    snapshot.save(out).map_err(|e| match e {
        aclwarden_core::Error::Io(source) => Error::io_with_path(source, out),
        other => Error::Core(other),
    })?;
    Ok(Output::ok(format!(
        "exported {} nodes ({} unreadable) to {}\n",
        stats.visited,
        stats.skipped,
        out.display()
    )))
}
