//! Crate error type
//!
//! The text-processing core only ever raises `InvalidArgument`. Absence of a
//! result is an empty collection or `None`, and malformed doc-comment markup
//! degrades to plain text instead of failing.

use std::path::PathBuf;

/// Errors surfaced by commark
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller broke an API contract (e.g. an unusable comment style)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading a file failed
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
