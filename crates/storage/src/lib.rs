pub mod backend;
pub mod error;
mod models;
pub mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::{FileInfo, FileKind};
pub use crate::path::{normalize as normalize_path, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
