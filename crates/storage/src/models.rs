//! Storage models.
//!
//! Metadata describing a file inside a library, whichever backend it lives in.

use std::path::PathBuf;
use time::OffsetDateTime;

/// What kind of object a path refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

/// File metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path relative to the library root, as requested by the caller
    pub path: PathBuf,
    /// File size in bytes (uncompressed size for archive entries)
    pub size: u64,
    pub kind: FileKind,
    /// Last modified timestamp, when the backend records one
    pub modified: Option<OffsetDateTime>,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            size,
            kind,
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: impl Into<Option<OffsetDateTime>>) -> Self {
        self.modified = modified.into();
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}
