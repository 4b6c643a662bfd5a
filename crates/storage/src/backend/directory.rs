//! Directory storage backend.
//!
//! Serves an unpacked library straight from the local filesystem. Requested
//! paths are joined under the library root as given; case and unicode
//! handling is left to the filesystem.

use crate::backend::BoxSyncRead;
use crate::error::{ErrorKind, Result};
use crate::models::{FileInfo, FileKind};
use crate::{StorageBackend, path::validate as validate_path};
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use iphoto_storage::backend::DirectoryBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = DirectoryBackend::new("iPhoto Library", "/Users/pooh/Pictures/iPhoto Library")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    name: String,
    /// Root directory of the library
    root: PathBuf,
}
impl DirectoryBackend {
    /// Create a new directory backend.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if `root` is not an
    /// existing directory. Unlike a writable store, a library is never
    /// created on demand.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a relative storage path.
    ///
    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn metadata(path: &Path, metadata: &Metadata) -> FileInfo {
        let kind = if metadata.is_dir() {
            FileKind::Directory
        } else if metadata.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::File
        };
        let modified = metadata.modified().ok().map(OffsetDateTime::from);
        FileInfo::new(path, metadata.len(), kind).with_modified(modified)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for DirectoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(Self::metadata(path, &metadata))
    }

    async fn open(&self, path: &Path) -> Result<BoxSyncRead> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(Box::new(file.into_std().await))
    }
}
