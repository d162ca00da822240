//! Error types for resource file operations

use std::path::PathBuf;
use thiserror::Error;

/// Resource file operation result type
pub type Result<T> = std::result::Result<T, Error>;

/// Resource file operation errors.
///
/// Lookups that find nothing return `None`; only real failures end up here.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening or reading the archive failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive structure could not be parsed
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// Entry uses a compression method other than STORED or DEFLATE
    #[error("Unsupported compression method {method} for entry {name}")]
    UnsupportedCompression { name: String, method: u16 },

    /// Two preload entries share a name
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// The archive path cannot be expressed as a `file:` URL
    #[error("Invalid base location: {}", .0.display())]
    InvalidBaseLocation(PathBuf),

    /// Resource URL could not be built from the base location
    #[error("Internal error building resource URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArchive(msg.into())
    }
}
