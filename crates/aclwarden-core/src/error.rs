//! Error types for aclwarden-core.
//!
//! One error type is shared by every aclwarden crate. The variants follow
//! the recovery granularity of a run: authorization failures prune a
//! subtree, missing or invalid roots and bad definitions drop a single
//! item, and transport failures abort the top-level operation.

/// Errors that can occur while parsing, comparing, or walking ACLs.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed entry string or unsupported scheme
    #[error("Parse error in '{input}': {message}")]
    Parse {
        /// The offending input
        input: String,
        /// What went wrong
        message: String,
    },

    /// A comparison could not be carried out (e.g. a non-IPv4 identity
    /// compared against a subnet)
    #[error("Validation error: {message}")]
    Validation {
        /// What went wrong
        message: String,
    },

    /// The session may not read the node
    #[error("Not authorized to read {path}")]
    Authorization {
        /// Node path
        path: String,
    },

    /// The node does not exist
    #[error("Node not found: {path}")]
    NotFound {
        /// Node path
        path: String,
    },

    /// The path is not a syntactically valid node path
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// No predicate is registered under this name
    #[error("Unknown predicate: {name}")]
    UnknownPredicate {
        /// Requested predicate name
        name: String,
    },

    /// A glob or regex pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        /// Pattern as supplied by the caller
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// A versioned write did not match the node's current version
    #[error("Version mismatch on {path}: expected {expected}, found {actual}")]
    BadVersion {
        /// Node path
        path: String,
        /// Version the caller expected
        expected: i32,
        /// Version the node holds
        actual: i32,
    },

    /// The coordination service could not be reached or failed
    #[error("Transport error: {message}")]
    Transport {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience `Result` type alias for aclwarden operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether the error is contained at item or subtree level.
    ///
    /// Recoverable errors drop one query, check, or subtree and let the
    /// rest of the run proceed. Everything else aborts the operation.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Parse { .. } => true,
            Error::Validation { .. } => true,
            Error::Authorization { .. } => true,
            Error::NotFound { .. } => true,
            Error::InvalidPath { .. } => true,
            Error::UnknownPredicate { .. } => true,
            Error::Pattern { .. } => true,
            Error::BadVersion { .. } => false,
            Error::Transport { .. } => false,
            Error::Config { .. } => false,
            Error::Io(_) => false,
            Error::Serialization(_) => false,
        }
    }

    /// Creates a new parse error.
    pub fn parse<I, M>(input: I, message: M) -> Self
    where
        I: Into<String>,
        M: Into<String>,
    {
        Error::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Creates a new authorization error for a path.
    pub fn authorization<S: Into<String>>(path: S) -> Self {
        Error::Authorization { path: path.into() }
    }

    /// Creates a new not-found error for a path.
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Creates a new invalid-path error.
    pub fn invalid_path<P, R>(path: P, reason: R) -> Self
    where
        P: Into<String>,
        R: Into<String>,
    {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new transport error with a message.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Error::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new transport error with a message and source error.
    pub fn transport_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
