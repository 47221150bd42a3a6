//! Entry comparison semantics.
//!
//! Two relations are defined between entries and they are deliberately
//! different:
//!
//! - [`equiv`] is symmetric. Identities match when either side is
//!   `world:anyone` or both are identical; permissions match when either
//!   mask is a subset of the other.
//! - [`satisfies`] is directional. It asks whether an *actual* entry grants
//!   everything a *required* entry asks for, and understands `ip` subnets
//!   on the actual side.

use std::net::Ipv4Addr;

use crate::acl::{Entry, Perms, Scheme};
use crate::{Error, Result};

/// Symmetric equivalence between two entries.
///
/// # Examples
///
/// ```
/// use aclwarden_core::acl::Entry;
/// use aclwarden_core::compare::equiv;
///
/// let a: Entry = "digest:bob:pw:r".parse().unwrap();
/// let b: Entry = "world:anyone:crw".parse().unwrap();
/// assert!(equiv(&a, &b));
/// ```
pub fn equiv(a: &Entry, b: &Entry) -> bool {
    let identity = a.is_world_anyone()
        || b.is_world_anyone()
        || (a.scheme() == b.scheme() && a.id() == b.id());
    if !identity {
        return false;
    }

    let common = a.perms() & b.perms();
    common == a.perms() || common == b.perms()
}

/// Does `actual` grant everything `required` asks for?
///
/// When both entries are `ip` and the actual identity is a CIDR block,
/// the required identity must be an IPv4 address inside it. A required
/// identity that is not IPv4 is a [`Error::Validation`], never a silent
/// mismatch.
///
/// # Examples
///
/// ```
/// use aclwarden_core::acl::Entry;
/// use aclwarden_core::compare::satisfies;
///
/// let required: Entry = "ip:10.0.0.5:r".parse().unwrap();
/// let actual: Entry = "ip:10.0.0.0/24:rw".parse().unwrap();
/// assert!(satisfies(&required, &actual).unwrap());
/// ```
pub fn satisfies(required: &Entry, actual: &Entry) -> Result<bool> {
    if !identity_satisfied(required, actual)? {
        return Ok(false);
    }
    Ok(grants(required.perms(), actual.perms()))
}

fn grants(required: Perms, actual: Perms) -> bool {
    required & actual == required
}

fn identity_satisfied(required: &Entry, actual: &Entry) -> Result<bool> {
    if actual.is_world_anyone() {
        return Ok(true);
    }

    if required.scheme() == Scheme::Ip && actual.scheme() == Scheme::Ip {
        if let Some(block) = Ipv4Block::parse(actual.id()) {
            let addr = required.id().parse::<Ipv4Addr>().map_err(|_| {
                Error::validation(format!(
                    "'{}' is not an IPv4 address and cannot be matched against subnet {}",
                    required.id(),
                    actual.id()
                ))
            })?;
            return Ok(block.contains(addr));
        }
    }

    Ok(required.scheme() == actual.scheme() && required.id() == actual.id())
}

// ============================================================================
// Ipv4Block
// ============================================================================

/// An IPv4 CIDR block such as `10.0.0.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Block {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Block {
    /// Parse `a.b.c.d/n` with `0 <= n <= 32`; anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let (addr, prefix) = s.split_once('/')?;
        let network = addr.parse::<Ipv4Addr>().ok()?;
        let prefix = prefix.parse::<u8>().ok()?;
        (prefix <= 32).then_some(Self { network, prefix })
    }

    fn mask(&self) -> u32 {
        match self.prefix {
            0 => 0,
            n => u32::MAX << (32 - u32::from(n)),
        }
    }

    /// Whether `addr` lies inside the block.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = self.mask();
        u32::from(self.network) & mask == u32::from(addr) & mask
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn e(s: &str) -> Entry {
        Entry::parse(s).unwrap()
    }

    // -------------------------------------------------------------------------
    // equiv
    // -------------------------------------------------------------------------

    #[test]
    fn test_equiv_world_wildcard_either_side() {
        let world = e("world:anyone:crw");
        for other in ["digest:bob:pw:r", "ip:1.2.3.4:rwc", "sasl:svc:rwcda"] {
            assert!(equiv(&e(other), &world), "{other}");
            assert!(equiv(&world, &e(other)), "{other}");
        }
    }

    #[test]
    fn test_equiv_world_disjoint_bits() {
        assert!(!equiv(&e("digest:bob:pw:d"), &e("world:anyone:crw")));
    }

    #[test]
    fn test_equiv_requires_same_identity() {
        assert!(equiv(&e("ip:1.2.3.4:r"), &e("ip:1.2.3.4:rw")));
        assert!(!equiv(&e("ip:1.2.3.4:r"), &e("ip:1.2.3.5:r")));
        assert!(!equiv(&e("sasl:bob:r"), &e("x509:bob:r")));
    }

    #[test]
    fn test_equiv_mutual_subset_not_equality() {
        assert!(equiv(&e("sasl:a:rwcda"), &e("sasl:a:r")));
        assert!(equiv(&e("sasl:a:r"), &e("sasl:a:rwcda")));
        assert!(!equiv(&e("sasl:a:rw"), &e("sasl:a:rc")));
    }

    #[test]
    fn test_equiv_is_not_subnet_aware() {
        assert!(!equiv(&e("ip:10.0.0.5:r"), &e("ip:10.0.0.0/24:r")));
    }

    // -------------------------------------------------------------------------
    // satisfies
    // -------------------------------------------------------------------------

    #[test]
    fn test_satisfies_subnet_contains() {
        assert!(satisfies(&e("ip:10.0.0.5:r"), &e("ip:10.0.0.0/24:r")).unwrap());
        assert!(!satisfies(&e("ip:10.0.1.5:r"), &e("ip:10.0.0.0/24:r")).unwrap());
    }

    #[test]
    fn test_satisfies_subnet_invalid_required_is_validation_error() {
        let err = satisfies(&e("ip:not-an-ip:r"), &e("ip:10.0.0.0/24:r")).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_satisfies_subnet_with_required_block() {
        // a required block is not an address
        assert!(satisfies(&e("ip:10.0.0.0/25:r"), &e("ip:10.0.0.0/24:r")).is_err());
    }

    #[test]
    fn test_satisfies_exact_ip_without_subnet() {
        assert!(satisfies(&e("ip:10.0.0.5:r"), &e("ip:10.0.0.5:rw")).unwrap());
        assert!(!satisfies(&e("ip:10.0.0.5:r"), &e("ip:10.0.0.6:rw")).unwrap());
        // actual not a block, required not an address: plain string compare
        assert!(!satisfies(&e("ip:bogus:r"), &e("ip:10.0.0.6:rw")).unwrap());
    }

    #[test]
    fn test_satisfies_is_directional_on_perms() {
        assert!(satisfies(&e("sasl:a:r"), &e("sasl:a:rwcda")).unwrap());
        assert!(!satisfies(&e("sasl:a:rwcda"), &e("sasl:a:r")).unwrap());
    }

    #[test]
    fn test_satisfies_world_on_actual_side_only() {
        assert!(satisfies(&e("digest:bob:pw:rw"), &e("world:anyone:rwcda")).unwrap());
        assert!(!satisfies(&e("world:anyone:r"), &e("digest:bob:pw:rwcda")).unwrap());
    }

    #[test]
    fn test_satisfies_world_still_checks_perms() {
        assert!(!satisfies(&e("digest:bob:pw:rw"), &e("world:anyone:r")).unwrap());
    }

    // -------------------------------------------------------------------------
    // Ipv4Block
    // -------------------------------------------------------------------------

    #[test]
    fn test_block_parse() {
        assert!(Ipv4Block::parse("10.0.0.0/8").is_some());
        assert!(Ipv4Block::parse("10.0.0.0/33").is_none());
        assert!(Ipv4Block::parse("10.0.0.0").is_none());
        assert!(Ipv4Block::parse("host/8").is_none());
    }

    #[test]
    fn test_block_edges() {
        let any = Ipv4Block::parse("0.0.0.0/0").unwrap();
        assert!(any.contains(Ipv4Addr::new(192, 168, 1, 1)));

        let host = Ipv4Block::parse("192.168.1.1/32").unwrap();
        assert!(host.contains(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(!host.contains(Ipv4Addr::new(192, 168, 1, 2)));
    }
}
