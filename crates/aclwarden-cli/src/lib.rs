//! # aclwarden-cli
//!
//! The `aclwarden` command: audits, checks, and enforces ACL policy on a
//! tree loaded from a JSON snapshot.
//!
//! This crate provides:
//! - Command-line parsing and dispatch
//! - The TOML configuration file and its `config` subcommands
//! - Colored, deterministic report rendering
//! - On-disk rollback files for live enforcement

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_handlers;
pub mod error;
pub mod report;
pub mod store;

pub use error::{Error, Result};
