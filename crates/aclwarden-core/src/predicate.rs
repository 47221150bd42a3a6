//! Predicate library and registry.
//!
//! Predicates are boolean questions asked about one node during a walk:
//! "is this node world-writable?", "does it carry exactly these entries?",
//! "has it drifted from its parent?". Each is available as a plain
//! function and, through [`Predicate::compile`], by registered name with
//! its arguments parsed once up front.
//!
//! ```rust
//! use aclwarden_core::acl::parse_entries;
//! use aclwarden_core::predicate::{NodeContext, Predicate};
//!
//! let predicate = Predicate::compile("open", &[]).unwrap();
//! let entries = parse_entries(&["world:anyone:cdrwa"]).unwrap();
//! let ctx = NodeContext::new("/app", &entries, None);
//! assert!(predicate.evaluate(&ctx).unwrap());
//! ```

use std::collections::HashSet;

use regex::Regex;

use crate::acl::{Entry, Perms, parse_entries};
use crate::compare::{equiv, satisfies};
use crate::pattern::{compile_glob, compile_regex};
use crate::{Error, Result};

// ============================================================================
// Predicate functions
// ============================================================================

/// Same number of entries, and every required canonical form is present.
pub fn exact_match(actual: &[Entry], required: &[Entry]) -> bool {
    if actual.len() != required.len() {
        return false;
    }
    let present: HashSet<String> = actual.iter().map(Entry::canonical).collect();
    required.iter().all(|r| present.contains(&r.canonical()))
}

/// The list grants `world:anyone` every permission.
pub fn open_access(actual: &[Entry]) -> bool {
    actual
        .iter()
        .any(|e| e.is_world_anyone() && e.perms() == Perms::all())
}

/// Every required entry is satisfied by at least one actual entry.
///
/// Fails with [`Error::Validation`] when a subnet comparison cannot be made.
pub fn satisfy_all(actual: &[Entry], required: &[Entry]) -> Result<bool> {
    for req in required {
        let mut found = false;
        for act in actual {
            if satisfies(req, act)? {
                found = true;
                break;
            }
        }
        if !found {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Node and parent lists are equal as unordered collections.
///
/// Note the polarity: this is true when the lists are the *same*. A
/// drift report is the negation.
pub fn same_as_parent(node: &[Entry], parent: &[Entry]) -> bool {
    if node.len() != parent.len() {
        return false;
    }
    let mut a: Vec<String> = node.iter().map(Entry::canonical).collect();
    let mut b: Vec<String> = parent.iter().map(Entry::canonical).collect();
    a.sort();
    b.sort();
    a == b
}

/// Any two distinct entries in the list are equivalent.
pub fn has_duplicates(actual: &[Entry]) -> bool {
    let mut seen: Vec<&Entry> = Vec::with_capacity(actual.len());
    for entry in actual {
        if seen.iter().any(|s| equiv(s, entry)) {
            return true;
        }
        seen.push(entry);
    }
    false
}

/// Some entry's canonical form matches some pattern.
pub fn entries_match(actual: &[Entry], patterns: &[Regex]) -> bool {
    actual.iter().any(|e| {
        let canonical = e.canonical();
        patterns.iter().any(|p| p.is_match(&canonical))
    })
}

/// The path matches some pattern.
pub fn path_matches(path: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|p| p.is_match(path))
}

// ============================================================================
// NodeContext
// ============================================================================

/// What a predicate may look at for one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// Node path
    pub path: &'a str,
    /// Node entries
    pub entries: &'a [Entry],
    /// Parent entries; `None` when there is no readable parent
    pub parent_entries: Option<&'a [Entry]>,
}

impl<'a> NodeContext<'a> {
    /// Bundle a node's view.
    pub fn new(path: &'a str, entries: &'a [Entry], parent_entries: Option<&'a [Entry]>) -> Self {
        Self {
            path,
            entries,
            parent_entries,
        }
    }
}

// ============================================================================
// Predicate + registry
// ============================================================================

/// A predicate with its arguments compiled.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// [`exact_match`] against the parsed entries
    Exact(Vec<Entry>),
    /// [`open_access`]
    Open,
    /// [`satisfy_all`] against the parsed entries
    Satisfies(Vec<Entry>),
    /// [`same_as_parent`]
    SameAsParent,
    /// [`has_duplicates`]
    Duplicates,
    /// [`entries_match`] with glob patterns
    AclGlob(Vec<Regex>),
    /// [`entries_match`] with regex patterns
    AclRegex(Vec<Regex>),
    /// [`path_matches`] with glob patterns
    PathGlob(Vec<Regex>),
    /// [`path_matches`] with regex patterns
    PathRegex(Vec<Regex>),
    /// Always true
    All,
}

type Builder = fn(&[String]) -> Result<Predicate>;

/// One registered predicate.
pub struct Registration {
    /// Name used in queries and policies
    pub name: &'static str,
    /// Argument shape, for help output
    pub usage: &'static str,
    /// One-line description
    pub summary: &'static str,
    build: Builder,
}

static REGISTRY: &[Registration] = &[
    Registration {
        name: "exact",
        usage: "ENTRY...",
        summary: "node carries exactly these entries",
        build: build_exact,
    },
    Registration {
        name: "open",
        usage: "",
        summary: "world:anyone holds every permission",
        build: build_open,
    },
    Registration {
        name: "satisfies",
        usage: "ENTRY...",
        summary: "every entry is granted by some node entry (subnet aware)",
        build: build_satisfies,
    },
    Registration {
        name: "same_as_parent",
        usage: "",
        summary: "node entries equal its parent's, ignoring order",
        build: build_same_as_parent,
    },
    Registration {
        name: "duplicates",
        usage: "",
        summary: "two node entries are equivalent",
        build: build_duplicates,
    },
    Registration {
        name: "acl_glob",
        usage: "GLOB...",
        summary: "some entry's canonical form matches a glob",
        build: build_acl_glob,
    },
    Registration {
        name: "acl_regex",
        usage: "REGEX...",
        summary: "some entry's canonical form matches a regex",
        build: build_acl_regex,
    },
    Registration {
        name: "path_glob",
        usage: "GLOB...",
        summary: "node path matches a glob",
        build: build_path_glob,
    },
    Registration {
        name: "path_regex",
        usage: "REGEX...",
        summary: "node path matches a regex",
        build: build_path_regex,
    },
    Registration {
        name: "all",
        usage: "",
        summary: "every node",
        build: build_all,
    },
];

fn build_exact(args: &[String]) -> Result<Predicate> {
    Ok(Predicate::Exact(parse_entries(args)?))
}

fn build_open(_: &[String]) -> Result<Predicate> {
    Ok(Predicate::Open)
}

fn build_satisfies(args: &[String]) -> Result<Predicate> {
    Ok(Predicate::Satisfies(parse_entries(args)?))
}

fn build_same_as_parent(_: &[String]) -> Result<Predicate> {
    Ok(Predicate::SameAsParent)
}

fn build_duplicates(_: &[String]) -> Result<Predicate> {
    Ok(Predicate::Duplicates)
}

fn build_acl_glob(args: &[String]) -> Result<Predicate> {
    Ok(Predicate::AclGlob(patterns("acl_glob", args, compile_glob)?))
}

fn build_acl_regex(args: &[String]) -> Result<Predicate> {
    Ok(Predicate::AclRegex(patterns("acl_regex", args, compile_regex)?))
}

fn build_path_glob(args: &[String]) -> Result<Predicate> {
    Ok(Predicate::PathGlob(patterns("path_glob", args, compile_glob)?))
}

fn build_path_regex(args: &[String]) -> Result<Predicate> {
    Ok(Predicate::PathRegex(patterns(
        "path_regex",
        args,
        compile_regex,
    )?))
}

fn build_all(_: &[String]) -> Result<Predicate> {
    Ok(Predicate::All)
}

fn patterns(name: &str, args: &[String], compile: fn(&str) -> Result<Regex>) -> Result<Vec<Regex>> {
    if args.is_empty() {
        return Err(Error::validation(format!(
            "predicate '{name}' needs at least one pattern"
        )));
    }
    args.iter().map(|a| compile(a)).collect()
}

/// All registered predicates, in help order.
pub fn registry() -> &'static [Registration] {
    REGISTRY
}

impl Predicate {
    /// Resolve `name` in the registry and compile its arguments.
    pub fn compile(name: &str, args: &[String]) -> Result<Self> {
        let registration = REGISTRY
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::UnknownPredicate {
                name: name.to_string(),
            })?;
        (registration.build)(args)
    }

    /// Registered name of this predicate.
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::Exact(_) => "exact",
            Predicate::Open => "open",
            Predicate::Satisfies(_) => "satisfies",
            Predicate::SameAsParent => "same_as_parent",
            Predicate::Duplicates => "duplicates",
            Predicate::AclGlob(_) => "acl_glob",
            Predicate::AclRegex(_) => "acl_regex",
            Predicate::PathGlob(_) => "path_glob",
            Predicate::PathRegex(_) => "path_regex",
            Predicate::All => "all",
        }
    }

    /// Evaluate against one node.
    pub fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<bool> {
        Ok(match self {
            Predicate::Exact(required) => exact_match(ctx.entries, required),
            Predicate::Open => open_access(ctx.entries),
            Predicate::Satisfies(required) => satisfy_all(ctx.entries, required)?,
            Predicate::SameAsParent => ctx
                .parent_entries
                .is_some_and(|parent| same_as_parent(ctx.entries, parent)),
            Predicate::Duplicates => has_duplicates(ctx.entries),
            Predicate::AclGlob(p) | Predicate::AclRegex(p) => entries_match(ctx.entries, p),
            Predicate::PathGlob(p) | Predicate::PathRegex(p) => path_matches(ctx.path, p),
            Predicate::All => true,
        })
    }
}
