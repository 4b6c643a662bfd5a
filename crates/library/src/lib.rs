//! Read an iPhoto library, unpacked or zipped, into a [`Catalog`].
//!
//! ```no_run
//! # async fn example() -> iphoto_library::error::Result<()> {
//! let catalog = iphoto_library::open("/Volumes/Backup/iPhoto Library.zip").await?;
//! for key in catalog.chronological() {
//!     let photo = &catalog.photos()[key];
//!     println!("{} {}", photo.date, photo.path);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
mod import;
mod stage;

pub use crate::catalog::{
    Catalog, Event, EventKey, Face, FaceKey, LatLon, Media, Photo, PhotoKey, Place, PlaceKey,
};
pub use crate::stage::STORE_FILES;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use iphoto_storage::backend::{ArchiveBackend, DirectoryBackend};
use iphoto_storage::BackendHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// How a library is opened.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Parent directory for staging the database files of zipped libraries.
    /// Defaults to the system temporary directory.
    pub staging_dir: Option<PathBuf>,
}

/// Open a library with default [`Options`].
pub async fn open(path: impl AsRef<Path>) -> Result<Catalog> {
    open_with(path, &Options::default()).await
}

/// Open a library directory, or a zip file containing a library at any
/// depth, and import it.
///
/// Either a complete catalog is returned or nothing is: any failure along
/// the way releases everything opened so far.
#[instrument(skip_all, fields(library = %path.as_ref().display()))]
pub async fn open_with(path: impl AsRef<Path>, options: &Options) -> Result<Catalog> {
    let path = path.as_ref();
    let name = path.file_name().map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy()).into_owned();
    let is_dir = tokio::fs::metadata(path).await.is_ok_and(|metadata| metadata.is_dir());

    let (backend, store) = if is_dir {
        let backend = DirectoryBackend::new(name, path).map_err(ErrorKind::storage)?;
        let store = stage::in_place(&backend).await?;
        let backend: BackendHandle = Arc::new(backend);
        (backend, store)
    } else {
        let archive = path.to_path_buf();
        let backend = tokio::task::spawn_blocking(move || ArchiveBackend::new(name, archive))
            .await
            .or_raise(|| ErrorKind::Storage)?
            .map_err(ErrorKind::storage)?;
        tracing::debug!(root = backend.root(), entries = backend.index().len(), "Archive opened");
        let store = stage::extract(&backend, options.staging_dir.as_deref()).await?;
        let backend: BackendHandle = Arc::new(backend);
        (backend, store)
    };

    let imported = import::import(store.path()).await;
    store.release();
    let catalog = Catalog::new(imported?, backend);
    tracing::info!(
        backend = catalog.backend().name(),
        photos = catalog.photos().len(),
        events = catalog.events().len(),
        "Library opened"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = open(temp_dir.path().join("missing.zip")).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(p) if p.ends_with("missing.zip")));
    }

    #[tokio::test]
    async fn test_open_not_a_library() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, b"not a zip").unwrap();
        let err = open(&path).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Storage));
    }
}
