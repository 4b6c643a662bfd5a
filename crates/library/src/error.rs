//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. These are the terminal errors of
//! [`open()`](crate::open): each failed attempt surfaces exactly one of them,
//! with the lower-level cause kept as a child.

use derive_more::{Display, Error};
use iphoto_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The input path, or a file inside the library, does not exist.
    #[display("not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The archive does not contain a recognizable library.
    #[display("can't find '{_0}' within archive")]
    MarkerNotFound(#[error(not(source))] String),
    /// One or more of the three database files is missing.
    #[display("incomplete library database, missing: {}", _0.join(", "))]
    IncompleteStore(#[error(not(source))] Vec<&'static str>),
    /// Staging the database files failed.
    #[display("could not stage library database")]
    Io,
    /// Reading the library database failed.
    #[display("could not import library database")]
    Import,
    /// Any other storage backend failure.
    #[display("storage backend error")]
    Storage,
}

impl ErrorKind {
    /// Lift a storage error into the library's terminal error kinds,
    /// preserving the storage error tree as a child.
    #[track_caller]
    pub fn storage(err: StorageError) -> Error {
        let kind = match &*err {
            StorageErrorKind::NotFound(path) => Self::NotFound(path.clone()),
            StorageErrorKind::MarkerNotFound(marker) => Self::MarkerNotFound(marker.clone()),
            _ => Self::Storage,
        };
        err.raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
