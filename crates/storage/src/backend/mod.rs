//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which gives an unpacked
//! library directory and a zipped library the same path lookup and file
//! opening behaviour. Which backend serves a library is decided once, when
//! the library is opened.

pub mod archive;
mod directory;
mod index;
#[cfg(feature = "mock")]
mod mock;

pub use self::archive::ArchiveBackend;
pub use self::directory::DirectoryBackend;
pub use self::index::{ArchiveIndex, IndexEntry, MARKER, RawEntry, locate_root};
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

pub type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Unified interface for storage backends.
///
/// Paths are relative to the library root (the directory containing
/// `Database/`, `Masters/` and `Thumbnails/`). Backends never change after
/// construction, so `stat` and `open` may be called concurrently.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use std::path::Path;
/// use iphoto_storage::{backend::StorageBackend, error::{ErrorKind, Result}};
///
/// async fn master_bytes(backend: &dyn StorageBackend, photo: &str) -> Result<Vec<u8>> {
///     let path = Path::new("Masters").join(photo);
///     let mut reader = backend.open(&path).await?;
///     let mut data = Vec::new();
///     reader.read_to_end(&mut data).map_err(ErrorKind::Io)?;
///     Ok(data)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;

    /// Open a file for streaming reads.
    ///
    /// The returned reader is owned by the caller and is `'static`, so it can
    /// be moved into [`spawn_blocking`](tokio::task::spawn_blocking).
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn open(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Release backend-level resources.
    ///
    /// Safe to call more than once. Readers already handed out by
    /// [`open()`](Self::open) stay valid.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
