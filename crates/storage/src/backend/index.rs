//! Library root discovery and lookup table for archive contents.

use crate::error::{ErrorKind, Result};
use crate::models::{FileInfo, FileKind};
use crate::path::{clean, normalize};
use std::collections::HashMap;
use std::path::Path;
use time::OffsetDateTime;

/// Parent directory of the library database files, relative to the library
/// root. Its presence is what identifies a library inside an archive.
pub const MARKER: &str = "Database/apdb";

/// An archive entry as read from the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Entry name with separators converted to slashes.
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
    pub modified: Option<OffsetDateTime>,
}

/// A lookup hit, pointing back at the archive entry it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Position of the entry in the archive.
    pub position: usize,
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
    pub modified: Option<OffsetDateTime>,
}
impl IndexEntry {
    pub fn info(&self, path: &Path) -> FileInfo {
        FileInfo::new(path, self.size, self.kind).with_modified(self.modified)
    }
}

/// Find the library root among archive entry names.
///
/// The [`MARKER`] must appear as whole path components: `XDatabase/apdb` or
/// `Database/apdbX` do not count. The first matching entry decides; the root
/// is whatever precedes the marker, cleaned, and empty if the marker sits at
/// the top of the archive.
///
/// ```
/// use iphoto_storage::backend::locate_root;
/// let root = locate_root(["Backup/MyLibrary/Database/apdb/Library.apdb"]).unwrap();
/// assert_eq!(root, "Backup/MyLibrary");
/// assert!(locate_root(["MyLibrary/XDatabase/apdb/Library.apdb"]).is_err());
/// ```
pub fn locate_root<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<String> {
    for name in names {
        if let Some(position) = find_marker(name) {
            let root = clean(&name[..position]);
            return Ok(if root == "." { String::new() } else { root });
        }
    }
    exn::bail!(ErrorKind::MarkerNotFound(MARKER.to_string()))
}

fn find_marker(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    name.match_indices(MARKER).map(|(position, _)| position).find(|&position| {
        let end = position + MARKER.len();
        let starts_component = position == 0 || bytes[position - 1] == b'/';
        let ends_component = end == bytes.len() || bytes[end] == b'/';
        starts_component && ends_component
    })
}

/// Normalized-path lookup table over the entries of one archive.
///
/// Keys are produced by [`normalize`](crate::path::normalize) and are
/// relative to the discovered library root. Entries outside the root are
/// not indexed (but are still listed by [`entries()`](Self::entries)).
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    root: String,
    raw: Vec<RawEntry>,
    lookup: HashMap<String, IndexEntry>,
}
impl ArchiveIndex {
    /// Discover the root and index every entry beneath it.
    ///
    /// When two entries normalize to the same key the later one wins; the
    /// collision is logged as a warning.
    pub fn new(raw: Vec<RawEntry>) -> Result<Self> {
        let root = locate_root(raw.iter().map(|entry| entry.name.as_str()))?;
        let prefix = match normalize(&root) {
            normalized if normalized == "." => String::new(),
            normalized => format!("{normalized}/"),
        };
        let mut lookup = HashMap::with_capacity(raw.len());
        for (position, entry) in raw.iter().enumerate() {
            let key = normalize(&entry.name);
            let Some(relative) = key.strip_prefix(&prefix) else {
                continue;
            };
            if relative.is_empty() || relative == "." {
                continue;
            }
            let indexed = IndexEntry {
                position,
                name: entry.name.clone(),
                size: entry.size,
                kind: entry.kind,
                modified: entry.modified,
            };
            if let Some(previous) = lookup.insert(relative.to_string(), indexed) {
                tracing::warn!(
                    key = relative,
                    kept = %entry.name,
                    dropped = %previous.name,
                    "Archive entries collide after path normalization; keeping the later entry"
                );
            }
        }
        tracing::debug!(root = %root, entries = raw.len(), indexed = lookup.len(), "Archive indexed");
        Ok(Self { root, raw, lookup })
    }

    /// The library root as stored in the archive (not normalized).
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Look up an entry by a path relative to the library root.
    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.lookup.get(&normalize(path))
    }

    /// All archive entries in archive order, as `(position, entry)`.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &RawEntry)> {
        self.raw.iter().enumerate()
    }

    /// Number of entries reachable through [`get()`](Self::get).
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}
