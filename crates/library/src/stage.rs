//! Locating and staging the library database files.
//!
//! SQLite can only open real files, so for a zipped library the three
//! database files are copied out into a temporary directory first. The
//! directory lives exactly as long as the returned [`Store`].

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use iphoto_storage::backend::{ArchiveBackend, DirectoryBackend, MARKER, StorageBackend};
use iphoto_storage::path::clean;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::instrument;

/// The library database files, in the order they are attached.
pub const STORE_FILES: [&str; 3] = ["Library.apdb", "Properties.apdb", "Faces.db"];

const STAGING_PREFIX: &str = "iphoto";

/// Where the library database files can be read from.
#[derive(Debug)]
pub(crate) enum Store {
    /// Read where they are, inside an unpacked library.
    InPlace(PathBuf),
    /// Copied out of an archive; removed when dropped.
    Staged(TempDir),
}
impl Store {
    pub(crate) fn path(&self) -> &Path {
        match self {
            Self::InPlace(path) => path,
            Self::Staged(temp_dir) => temp_dir.path(),
        }
    }

    /// Remove a staging directory now, logging (rather than failing on) any
    /// leftovers.
    pub(crate) fn release(self) {
        if let Self::Staged(temp_dir) = self {
            let path = temp_dir.path().to_path_buf();
            match temp_dir.close() {
                Ok(()) => tracing::debug!(staging = %path.display(), "Staging directory removed"),
                Err(err) => tracing::warn!(staging = %path.display(), error = %err, "Failed to remove staging directory"),
            }
        }
    }
}

/// Check that an unpacked library has all of its database files.
#[instrument(skip_all, fields(backend = backend.name()))]
pub(crate) async fn in_place(backend: &DirectoryBackend) -> Result<Store> {
    let mut missing = Vec::new();
    for file in STORE_FILES {
        let path = Path::new(MARKER).join(file);
        if !backend.exists(&path).await.map_err(ErrorKind::storage)? {
            missing.push(file);
        }
    }
    if !missing.is_empty() {
        exn::bail!(ErrorKind::IncompleteStore(missing));
    }
    Ok(Store::InPlace(backend.root().join(MARKER)))
}

/// Copy the database files out of a zipped library.
///
/// Files are matched by exact (case-sensitive) name beneath the library
/// root. If any are missing nothing is extracted. Staging happens in a new
/// temporary directory, inside `staging_dir` if given.
#[instrument(skip_all, fields(backend = backend.name(), root = backend.root()))]
pub(crate) async fn extract(backend: &ArchiveBackend, staging_dir: Option<&Path>) -> Result<Store> {
    let directory = match backend.root() {
        "" => MARKER.to_string(),
        root => format!("{root}/{MARKER}"),
    };
    let mut positions: [Option<usize>; 3] = [None; 3];
    for (position, name) in backend.entries() {
        let name = clean(name);
        let Some(file) = name.strip_prefix(&directory).and_then(|rest| rest.strip_prefix('/')) else {
            continue;
        };
        if let Some(slot) = STORE_FILES.iter().position(|expected| *expected == file) {
            positions[slot] = Some(position);
        }
    }
    let missing: Vec<&'static str> = STORE_FILES
        .iter()
        .zip(&positions)
        .filter(|(_, position)| position.is_none())
        .map(|(file, _)| *file)
        .collect();
    if !missing.is_empty() {
        exn::bail!(ErrorKind::IncompleteStore(missing));
    }

    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX);
    let temp_dir = match staging_dir {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    }
    .or_raise(|| ErrorKind::Io)?;
    for (file, position) in STORE_FILES.iter().zip(positions.into_iter().flatten()) {
        let destination = temp_dir.path().join(file);
        let bytes = backend
            .extract_entry(position, &destination)
            .await
            .map_err(|err| err.raise(ErrorKind::Io))?;
        tracing::debug!(file, bytes, "Staged library database file");
    }
    Ok(Store::Staged(temp_dir))
}
