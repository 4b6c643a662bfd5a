//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Archive does not contain a library database directory.
    #[display("can't find '{_0}' within archive")]
    MarkerNotFound(#[error(not(source))] String),
    /// Archive is unreadable or corrupt.
    #[display("invalid or corrupted archive")]
    Archive,
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::MarkerNotFound("Database/apdb".to_string()).to_string(),
            "can't find 'Database/apdb' within archive"
        );
        assert_eq!(
            ErrorKind::NotFound(PathBuf::from("Masters/2020/IMG.JPG")).to_string(),
            "file not found: Masters/2020/IMG.JPG"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::Archive.is_retryable());
        assert!(!ErrorKind::MarkerNotFound("Database/apdb".to_string()).is_retryable());
        assert!(ErrorKind::BackendError("archive is closed".to_string()).is_retryable());
    }
}
