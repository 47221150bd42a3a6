//! Error types for aclwarden-cli

use std::path::Path;

use thiserror::Error;

/// Result type alias for aclwarden-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aclwarden-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from aclwarden-core or aclwarden-engine
    #[error(transparent)]
    Core(#[from] aclwarden_core::Error),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// File operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Config could not be written as TOML
    #[error("Cannot write TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }

    /// Wraps an I/O error with the path it concerns.
    pub fn io_with_path(source: std::io::Error, path: &Path) -> Self {
        Error::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
