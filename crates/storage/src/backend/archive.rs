//! Zip archive storage backend.
//!
//! A zipped library can sit at any depth inside its archive. The root is
//! discovered once when the backend is built (see
//! [`locate_root`](super::locate_root)) and every entry beneath it is
//! indexed by its normalized path, so lookups ignore case, separator style
//! and unicode composition.

use crate::backend::{ArchiveIndex, BoxSyncRead, IndexEntry, RawEntry};
use crate::error::{ErrorKind, Result};
use crate::models::{FileInfo, FileKind};
use crate::StorageBackend;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::instrument;
use zip::ZipArchive;

type SharedArchive = Arc<Mutex<Option<ZipArchive<File>>>>;

/// Symlink targets longer than this are truncated.
const SYMLINK_TARGET_LIMIT: u64 = 4096;
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Zip archive storage backend.
///
/// The archive stays open until [`close()`](StorageBackend::close) is called
/// or the backend is dropped. Opening an entry decompresses it into an
/// anonymous temporary file, which the returned reader streams from. The
/// archive is locked while an entry is decompressed, so concurrent callers
/// are served one entry at a time.
///
/// # Examples
///
/// ```no_run
/// use iphoto_storage::backend::{ArchiveBackend, StorageBackend};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = ArchiveBackend::new("backup", "/backups/iPhoto Library.zip")?;
/// println!("library root: {:?}", backend.root());
/// let info = backend.stat(Path::new("masters/2020/img_0001.jpg")).await?;
/// println!("{} bytes", info.size);
/// # Ok(())
/// # }
/// ```
pub struct ArchiveBackend {
    name: String,
    path: PathBuf,
    index: ArchiveIndex,
    archive: SharedArchive,
}
impl ArchiveBackend {
    /// Open a zip archive and index the library inside it.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](ErrorKind::NotFound) if the archive does not exist.
    /// - [`Archive`](ErrorKind::Archive) if it is not a readable zip file.
    /// - [`MarkerNotFound`](ErrorKind::MarkerNotFound) if no entry contains
    ///   the library database directory.
    #[instrument(skip_all, fields(archive = %path.as_ref().display()))]
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.clone()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.clone()),
            _ => ErrorKind::Io(e),
        })?;
        let mut archive = ZipArchive::new(file).or_raise(|| ErrorKind::Archive)?;
        let index = ArchiveIndex::new(Self::read_entries(&mut archive)?)?;
        Ok(Self {
            name: name.into(),
            path,
            index,
            archive: Arc::new(Mutex::new(Some(archive))),
        })
    }

    /// Path of the archive file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Library root inside the archive, as stored (empty at the top level).
    pub fn root(&self) -> &str {
        self.index.root()
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Raw entry names (slash separated) in archive order, with the position
    /// to pass to [`extract_entry()`](Self::extract_entry).
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.index.entries().map(|(position, entry)| (position, entry.name.as_str()))
    }

    /// Copy the full contents of an entry into a new file at `destination`.
    ///
    /// Returns the number of bytes written.
    pub async fn extract_entry(&self, position: usize, destination: impl Into<PathBuf>) -> Result<u64> {
        let destination = destination.into();
        self.with_archive(move |archive| {
            let mut entry = archive.by_index(position).or_raise(|| ErrorKind::Archive)?;
            let mut output = File::create(&destination).map_err(ErrorKind::Io)?;
            Ok(std::io::copy(&mut entry, &mut output).map_err(ErrorKind::Io)?)
        })
        .await
    }

    /// Every symlink entry in the archive with its (possibly truncated) target.
    ///
    /// Entries whose target cannot be read as UTF-8 are logged and skipped.
    pub async fn symlinks(&self) -> Result<Vec<(String, String)>> {
        let links: Vec<(usize, String)> = self
            .index
            .entries()
            .filter(|(_, entry)| entry.kind == FileKind::Symlink)
            .map(|(position, entry)| (position, entry.name.clone()))
            .collect();
        self.with_archive(move |archive| {
            let mut targets = Vec::with_capacity(links.len());
            for (position, name) in links {
                match read_link(archive, position) {
                    Ok(target) => targets.push((name, target)),
                    Err(err) => tracing::warn!(entry = %name, error = ?err, "Skipping unreadable symlink"),
                }
            }
            Ok(targets)
        })
        .await
    }

    fn lookup(&self, path: &Path) -> Result<&IndexEntry> {
        self.index
            .get(&path.to_string_lossy())
            .ok_or_raise(|| ErrorKind::NotFound(path.to_path_buf()))
    }

    /// Run blocking archive work off the async runtime while holding the lock.
    async fn with_archive<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ZipArchive<File>) -> Result<T> + Send + 'static,
    {
        let shared = Arc::clone(&self.archive);
        tokio::task::spawn_blocking(move || {
            let mut guard = shared
                .lock()
                .map_err(|_| ErrorKind::BackendError("archive lock poisoned".to_string()))?;
            let archive = guard
                .as_mut()
                .ok_or_raise(|| ErrorKind::BackendError("archive is closed".to_string()))?;
            work(archive)
        })
        .await
        .or_raise(|| ErrorKind::BackendError("archive task failed".to_string()))?
    }

    fn read_entries(archive: &mut ZipArchive<File>) -> Result<Vec<RawEntry>> {
        (0..archive.len())
            .map(|position| {
                let entry = archive.by_index_raw(position).or_raise(|| ErrorKind::Archive)?;
                let is_symlink = entry.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK);
                let kind = match (entry.is_dir(), is_symlink) {
                    (true, _) => FileKind::Directory,
                    (false, true) => FileKind::Symlink,
                    (false, false) => FileKind::File,
                };
                Ok(RawEntry {
                    name: entry.name().replace('\\', "/"),
                    size: entry.size(),
                    kind,
                    modified: entry.last_modified().and_then(zip_datetime),
                })
            })
            .collect()
    }
}

fn read_link(archive: &mut ZipArchive<File>, position: usize) -> Result<String> {
    let entry = archive.by_index(position).or_raise(|| ErrorKind::Archive)?;
    let mut target = String::new();
    entry.take(SYMLINK_TARGET_LIMIT).read_to_string(&mut target).map_err(ErrorKind::Io)?;
    Ok(target)
}

/// Zip timestamps carry no zone; they are taken as UTC.
fn zip_datetime(datetime: zip::DateTime) -> Option<OffsetDateTime> {
    let month = Month::try_from(datetime.month()).ok()?;
    let date = Date::from_calendar_date(i32::from(datetime.year()), month, datetime.day()).ok()?;
    let time = Time::from_hms(datetime.hour(), datetime.minute(), datetime.second()).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

#[async_trait]
impl StorageBackend for ArchiveBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        Ok(self.lookup(path)?.info(path))
    }

    async fn open(&self, path: &Path) -> Result<BoxSyncRead> {
        let position = self.lookup(path)?.position;
        let spool = self
            .with_archive(move |archive| {
                let mut entry = archive.by_index(position).or_raise(|| ErrorKind::Archive)?;
                let mut spool = tempfile::tempfile().map_err(ErrorKind::Io)?;
                std::io::copy(&mut entry, &mut spool).map_err(ErrorKind::Io)?;
                spool.rewind().map_err(ErrorKind::Io)?;
                Ok(spool)
            })
            .await?;
        Ok(Box::new(spool))
    }

    async fn close(&self) -> Result<()> {
        let closed = self
            .archive
            .lock()
            .map_err(|_| ErrorKind::BackendError("archive lock poisoned".to_string()))?
            .take();
        if closed.is_some() {
            tracing::info!(backend = %self.name, archive = %self.path.display(), "Archive closed");
        }
        Ok(())
    }
}
