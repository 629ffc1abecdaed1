//! # Controller Error Types
//!
//! Feed and config errors are recoverable: library callers fall back to
//! defaults. Only [`SessionError`] can stop a session from starting.

use std::path::PathBuf;

use tether_protocol::ProtocolError;
use thiserror::Error;

/// Scenario feed could not be used.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed could not be opened or read.
    #[error("cannot read trial feed {path}: {source}")]
    Io {
        /// Feed location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A line was not a valid scenario record.
    #[error("trial feed line {line}: {source}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Reading a line from an open stream failed.
    #[error("trial feed stream failed at line {line}: {source}")]
    Read {
        /// 1-based line number.
        line: usize,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Controller config could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Config location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this config.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A session could not start.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Region sizing or addressing failed.
    #[error("shared memory: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
