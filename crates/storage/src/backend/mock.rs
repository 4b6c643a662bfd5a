//! In-memory storage backend for testing.

use crate::backend::BoxSyncRead;
use crate::error::{ErrorKind, Result};
use crate::models::{FileInfo, FileKind};
use crate::path::validate as validate_path;
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory storage backend for testing.
///
/// Files are fixed at construction, like a real library. Closing is counted
/// rather than enforced so tests can assert when (and how often) a backend
/// was released.
///
/// # Examples
///
/// ```
/// use iphoto_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("Masters/2020/IMG.JPG", b"jpeg"),
/// ]);
/// assert!(backend.exists(Path::new("Masters/2020/IMG.JPG")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: HashMap<PathBuf, Vec<u8>>,
    closed: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut storage = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            storage.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage,
            closed: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// How many times [`close()`](StorageBackend::close) has been called.
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn get(&self, path: &Path) -> Result<&Vec<u8>> {
        let validated = validate_path(path)?;
        self.storage
            .get(&validated)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let data = self.get(path)?;
        Ok(FileInfo::new(path, data.len() as u64, FileKind::File))
    }

    async fn open(&self, path: &Path) -> Result<BoxSyncRead> {
        let data = self.get(path)?.clone();
        Ok(Box::new(Cursor::new(data)))
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
