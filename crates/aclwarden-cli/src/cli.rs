//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{CONFIG_ENV, SNAPSHOT_ENV};

/// Audit, check, and enforce ACL policy on a coordination-service tree
#[derive(Parser, Debug)]
#[command(name = "aclwarden", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<String>,

    /// Tree snapshot (JSON) to operate on
    #[arg(short, long, global = true, env = SNAPSHOT_ENV)]
    pub snapshot: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one named predicate below a root
    Query {
        /// Predicate name (see `predicates`)
        name: String,
        /// Walk root
        root: String,
        /// Predicate arguments
        args: Vec<String>,
        /// Print matches only, as a flat list
        #[arg(long)]
        list: bool,
    },
    /// List every reachable node and its entries
    Inventory,
    /// Run the configured checks; exits 1 unless all pass
    Check,
    /// Run the configured queries and checks in one grouped pass
    Audit,
    /// Apply the configured policies
    Enforce {
        /// Write changes instead of reporting them
        #[arg(long)]
        live: bool,
        /// Save the modified tree back to the snapshot file
        #[arg(long, requires = "live")]
        write_back: bool,
    },
    /// Replay or manage rollback files
    Rollback {
        #[command(subcommand)]
        action: RollbackAction,
    },
    /// Save a snapshot of the reachable tree
    Export {
        /// Output file
        out: PathBuf,
        /// Subtree to export
        #[arg(long, default_value = "/")]
        root: String,
    },
    /// List registered predicates
    Predicates,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `rollback` subcommands.
#[derive(Subcommand, Debug)]
pub enum RollbackAction {
    /// Restore the entries recorded in a rollback file
    Apply {
        /// Rollback file
        file: PathBuf,
        /// Save the restored tree back to the snapshot file
        #[arg(long)]
        write_back: bool,
    },
    /// List rollback files, newest first
    List,
    /// Delete old rollback files
    Purge {
        /// Files to keep (defaults to `settings.rollback_keep`)
        #[arg(long)]
        keep: Option<usize>,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the config file location
    Path,
    /// Print a value by dotted key
    Get {
        /// Key such as `settings.rollback_keep`
        key: String,
    },
    /// Write a starter config file
    Init {
        /// Where to write (defaults to the resolved config path)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_with_args() {
        let cli = Cli::try_parse_from([
            "aclwarden",
            "--snapshot",
            "tree.json",
            "query",
            "acl_glob",
            "/app",
            "sasl:*:*",
            "--list",
        ])
        .unwrap();
        match cli.command {
            Command::Query {
                name,
                root,
                args,
                list,
            } => {
                assert_eq!(name, "acl_glob");
                assert_eq!(root, "/app");
                assert_eq!(args, vec!["sasl:*:*".to_string()]);
                assert!(list);
            }
            other => unreachable!("Unexpected command {other:?}"),
        }
        assert_eq!(cli.snapshot, Some(PathBuf::from("tree.json")));
    }

    #[test]
    fn test_write_back_requires_live() {
        assert!(Cli::try_parse_from(["aclwarden", "enforce", "--write-back"]).is_err());
        assert!(Cli::try_parse_from(["aclwarden", "enforce", "--live", "--write-back"]).is_ok());
    }

    #[test]
    fn test_rollback_purge_keep() {
        let cli = Cli::try_parse_from(["aclwarden", "rollback", "purge", "--keep", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Rollback {
                action: RollbackAction::Purge { keep: Some(3) }
            }
        ));
    }
}
