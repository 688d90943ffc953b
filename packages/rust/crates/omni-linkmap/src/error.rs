//! Error types for link map operations.
//!
//! Library code returns `LinkMapError`; the `linkmap` binary wraps it in `anyhow`.

use thiserror::Error;

/// Error types for link graph construction, reconciliation and sessions.
#[derive(Error, Debug)]
pub enum LinkMapError {
    /// File does not exist (or its metadata cannot be read).
    #[error("File not found: {0}")]
    NotFound(String),

    /// File exceeds the configured read limit.
    #[error("File too large: {0} bytes (limit: {1})")]
    TooLarge(u64, u64),

    /// File contains binary content (NULL bytes detected).
    #[error("Binary file detected: {0}")]
    BinaryFile(String),

    /// Low-level I/O error from std::io.
    #[error("IO error: {0}")]
    System(#[from] std::io::Error),

    /// Scan root is missing or not a directory.
    #[error("invalid notebook root '{path}': {reason}")]
    InvalidRoot {
        /// Root as given by the caller.
        path: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A session was requested without any root directory.
    #[error("this command can only be activated in an open directory")]
    NoRootDirectory,

    /// Settings file could not be interpreted.
    #[error("invalid linkmap config: {0}")]
    Config(String),

    /// `fileIdRegexp` does not compile.
    #[error("invalid file id pattern '{pattern}': {source}")]
    Pattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },

    /// File watcher could not be created or attached.
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Session actor is gone (closed or crashed).
    #[error("graph session is closed")]
    SessionClosed,
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, LinkMapError>;
