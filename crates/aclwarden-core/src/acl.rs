//! Access-control entry model.
//!
//! An entry grants a permission mask to an identity under a scheme. The
//! wire form is `scheme:identity:letters`:
//!
//! ```rust
//! use aclwarden_core::acl::{Entry, Perms, Scheme};
//!
//! let entry: Entry = "digest:alice:c2VjcmV0:adwr".parse().unwrap();
//! assert_eq!(entry.scheme(), Scheme::Digest);
//! assert_eq!(entry.id(), "alice:c2VjcmV0");
//! assert_eq!(entry.perms(), Perms::READ | Perms::WRITE | Perms::DELETE | Perms::ADMIN);
//!
//! // Canonical form always orders letters r, w, c, d, a
//! assert_eq!(entry.to_string(), "digest:alice:c2VjcmV0:rwda");
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// Perms
// ============================================================================

bitflags! {
    /// Permission mask carried by an entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Perms: u8 {
        /// `r`: read node data and list children
        const READ = 1;
        /// `w`: set node data
        const WRITE = 2;
        /// `c`: create children
        const CREATE = 4;
        /// `d`: delete children
        const DELETE = 8;
        /// `a`: set the node's ACL
        const ADMIN = 16;
    }
}

/// Letter for each permission bit, in canonical order.
const LETTERS: [(char, Perms); 5] = [
    ('r', Perms::READ),
    ('w', Perms::WRITE),
    ('c', Perms::CREATE),
    ('d', Perms::DELETE),
    ('a', Perms::ADMIN),
];

impl Perms {
    /// Build a mask from permission letters.
    ///
    /// Only the presence of `r`, `w`, `c`, `d`, `a` matters; order,
    /// repetition, and any other characters are ignored.
    pub fn parse(letters: &str) -> Self {
        letters
            .chars()
            .filter_map(|ch| LETTERS.iter().find(|(l, _)| *l == ch).map(|(_, p)| *p))
            .fold(Perms::empty(), |acc, p| acc | p)
    }

    /// Canonical letters for this mask (`rwcda` order).
    pub fn letters(&self) -> String {
        LETTERS
            .iter()
            .filter(|(_, p)| self.contains(*p))
            .map(|(l, _)| *l)
            .collect()
    }
}

impl fmt::Display for Perms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

// ============================================================================
// Scheme
// ============================================================================

/// Authentication scheme of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    /// `world:anyone`
    World,
    /// Client address or CIDR block
    Ip,
    /// Any authenticated user of the session
    Auth,
    /// `user:base64(sha1(user:password))`
    Digest,
    /// Kerberos / SASL principal
    Sasl,
    /// Client certificate principal
    X509,
}

impl Scheme {
    /// Scheme name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::World => "world",
            Scheme::Ip => "ip",
            Scheme::Auth => "auth",
            Scheme::Digest => "digest",
            Scheme::Sasl => "sasl",
            Scheme::X509 => "x509",
        }
    }

    /// Number of `:` allowed inside the identity segment.
    fn id_separators(&self) -> std::ops::RangeInclusive<usize> {
        match self {
            Scheme::Digest => 1..=1,
            Scheme::Auth => 0..=1,
            _ => 0..=0,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "world" => Ok(Scheme::World),
            "ip" => Ok(Scheme::Ip),
            "auth" => Ok(Scheme::Auth),
            "digest" => Ok(Scheme::Digest),
            "sasl" => Ok(Scheme::Sasl),
            "x509" => Ok(Scheme::X509),
            other => Err(Error::parse(s, format!("unsupported scheme '{other}'"))),
        }
    }
}

// ============================================================================
// Entry
// ============================================================================

/// A single access-control entry attached to a node.
///
/// Serializes as its canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Entry {
    scheme: Scheme,
    id: String,
    perms: Perms,
}

impl Entry {
    /// Creates an entry from its parts.
    pub fn new(scheme: Scheme, id: impl Into<String>, perms: Perms) -> Self {
        Self {
            scheme,
            id: id.into(),
            perms,
        }
    }

    /// `world:anyone` with the given permissions.
    pub fn world_anyone(perms: Perms) -> Self {
        Self::new(Scheme::World, "anyone", perms)
    }

    /// Parse an entry from its wire form.
    ///
    /// The permission letters are split off the right so identities that
    /// carry their own separator (`digest:user:secret:rw`) parse correctly.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (head, letters) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| Error::parse(input, "expected scheme:id:perms"))?;
        let (scheme, id) = head
            .split_once(':')
            .ok_or_else(|| Error::parse(input, "expected scheme:id:perms"))?;
        let scheme = scheme
            .parse::<Scheme>()
            .map_err(|_| Error::parse(input, format!("unsupported scheme '{scheme}'")))?;

        if !scheme.id_separators().contains(&id.matches(':').count()) {
            return Err(Error::parse(
                input,
                format!("malformed segment count for {scheme} entry"),
            ));
        }

        Ok(Self::new(scheme, id, Perms::parse(letters)))
    }

    /// Entry scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Entry identity (may contain `:` for digest/auth).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Permission mask.
    pub fn perms(&self) -> Perms {
        self.perms
    }

    /// True for `world:anyone`, whatever the permissions.
    pub fn is_world_anyone(&self) -> bool {
        self.scheme == Scheme::World && self.id == "anyone"
    }

    /// Returns `true` if the entry grants read.
    pub fn has_read(&self) -> bool {
        self.perms.contains(Perms::READ)
    }

    /// Returns `true` if the entry grants write.
    pub fn has_write(&self) -> bool {
        self.perms.contains(Perms::WRITE)
    }

    /// Returns `true` if the entry grants create.
    pub fn has_create(&self) -> bool {
        self.perms.contains(Perms::CREATE)
    }

    /// Returns `true` if the entry grants delete.
    pub fn has_delete(&self) -> bool {
        self.perms.contains(Perms::DELETE)
    }

    /// Returns `true` if the entry grants admin.
    pub fn has_admin(&self) -> bool {
        self.perms.contains(Perms::ADMIN)
    }

    /// Canonical `scheme:id:letters` form.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scheme, self.id, self.perms)
    }
}

impl FromStr for Entry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Entry::parse(s)
    }
}

impl TryFrom<String> for Entry {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Entry::parse(&s)
    }
}

impl From<Entry> for String {
    fn from(entry: Entry) -> Self {
        entry.to_string()
    }
}

/// Parse every string in `args` as an entry, failing on the first bad one.
pub fn parse_entries<S: AsRef<str>>(args: &[S]) -> Result<Vec<Entry>> {
    args.iter().map(|a| Entry::parse(a.as_ref())).collect()
}

/// Canonical forms of a list, in list order.
pub fn canonical_list(entries: &[Entry]) -> Vec<String> {
    entries.iter().map(Entry::canonical).collect()
}

// ============================================================================
// Tests
// ============================================================================
