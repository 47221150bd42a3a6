//! The aclwarden configuration file.
//!
//! A single TOML file holds display settings, the rollback location, and
//! the queries, checks, and policies the `audit`, `check`, and `enforce`
//! commands run. The file is found through `--config` (or the
//! `ACLWARDEN_CONFIG` variable, which clap maps onto the same flag) and
//! falls back to `<config dir>/aclwarden/config.toml`.

use std::path::{Path, PathBuf};

use aclwarden_engine::check::CheckDef;
use aclwarden_engine::enforce::Policy;
use aclwarden_engine::query::QueryDef;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name used for the config directory and in help text.
pub const PROJECT_NAME: &str = "aclwarden";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ACLWARDEN_CONFIG";

/// Environment variable naming the snapshot file.
pub const SNAPSHOT_ENV: &str = "ACLWARDEN_SNAPSHOT";

const DEFAULT_ROLLBACK_DIR: &str = "~/.local/state/aclwarden/rollback";
const DEFAULT_ROLLBACK_KEEP: usize = 10;

// ============================================================================
// Types
// ============================================================================

/// Display and storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Color terminal output
    pub color: bool,
    /// Where live enforcement writes rollback files; `~` is expanded
    pub rollback_dir: String,
    /// Rollback files kept after each live run
    pub rollback_keep: usize,
    /// Snapshot file used when `--snapshot` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            rollback_dir: DEFAULT_ROLLBACK_DIR.to_string(),
            rollback_keep: DEFAULT_ROLLBACK_KEEP,
            snapshot: None,
        }
    }
}

impl Settings {
    /// The rollback directory with `~` and variables expanded.
    pub fn rollback_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.rollback_dir).map_err(|e| {
            Error::config(format!("Cannot expand rollback_dir '{}': {e}", self.rollback_dir))
        })?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// `[settings]`
    pub settings: Settings,
    /// `[[queries]]` run by `audit`
    pub queries: Vec<QueryDef>,
    /// `[[checks]]` run by `check` and `audit`
    pub checks: Vec<CheckDef>,
    /// `[[policies]]` run by `enforce`
    pub policies: Vec<Policy>,
}

// ============================================================================
// Loading
// ============================================================================

/// `<config dir>/aclwarden/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(PROJECT_NAME).join("config.toml"))
}

/// The explicit path (tilde-expanded) or the default one.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(PathBuf::from(shellexpand::tilde(path).as_ref())),
        None => default_config_path(),
    }
}

impl AuditConfig {
    /// Load the resolved config file.
    ///
    /// A missing default file yields the default config; a missing file
    /// that was asked for explicitly is an error.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let Some(path) = resolve_config_path(explicit) else {
            log::debug!("No config directory on this platform; using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            if explicit.is_some() {
                return Err(Error::config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            log::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let config = Self::from_toml_str(&text)?;
        log::debug!(
            "Loaded {} ({} queries, {} checks, {} policies)",
            path.display(),
            config.queries.len(),
            config.checks.len(),
            config.policies.len()
        );
        Ok(config)
    }

    /// Parse config text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A starter config written by `config init`.
    pub fn template() -> Self {
        Self {
            settings: Settings::default(),
            queries: vec![
                QueryDef::new("open", "/", &[]),
                QueryDef::new("duplicates", "/", &[]),
            ],
            checks: vec![CheckDef {
                title: "root is read-only for everyone".to_string(),
                root: "/".to_string(),
                path: "/".to_string(),
                regex: false,
                entries: vec!["world:anyone:r".to_string()],
                negate: false,
            }],
            policies: vec![Policy {
                title: "close open nodes".to_string(),
                query: QueryDef::new("open", "/", &[]),
                append: false,
                entries: vec!["world:anyone:r".to_string()],
            }],
        }
    }
}
