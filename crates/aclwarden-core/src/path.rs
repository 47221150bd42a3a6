//! Node path utilities.
//!
//! Paths are `/`-delimited, absolute, and have no trailing slash except
//! the root itself.

use crate::{Error, Result};

/// The root path.
pub const ROOT: &str = "/";

/// Check that `path` is a syntactically valid node path.
///
/// # Examples
///
/// ```
/// use aclwarden_core::path::validate_path;
///
/// assert!(validate_path("/").is_ok());
/// assert!(validate_path("/app/config").is_ok());
/// assert!(validate_path("app").is_err());
/// assert!(validate_path("/app/").is_err());
/// ```
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "must start with '/'"));
    }
    if path == ROOT {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(Error::invalid_path(path, "must not end with '/'"));
    }
    if path.contains('\0') {
        return Err(Error::invalid_path(path, "contains a null character"));
    }
    for segment in path[1..].split('/') {
        match segment {
            "" => return Err(Error::invalid_path(path, "empty segment")),
            "." | ".." => {
                return Err(Error::invalid_path(path, "relative segment"));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Join a parent path and a child name.
pub fn join(parent: &str, child: &str) -> String {
    if parent == ROOT {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Parent of a path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects() {
        for bad in ["", "a", "/a//b", "/a/", "/a/./b", "/a/../b", "/a\0"] {
            assert!(validate_path(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_validate_accepts() {
        for good in ["/", "/a", "/a/b-c/d.e", "/zookeeper/quota"] {
            assert!(validate_path(good).is_ok(), "{good:?}");
        }
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/"), None);
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/a/b"), Some("/a"));
    }
}
