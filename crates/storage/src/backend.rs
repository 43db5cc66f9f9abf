use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use tracing::info;

use crate::error::StorageError;

/// Unified storage backend wrapping object_store.
pub enum StorageBackend {
    Local(LocalBackend),
    Memory(Arc<InMemory>),
}

impl StorageBackend {
    /// Get the underlying ObjectStore.
    pub fn store(&self) -> &dyn ObjectStore {
        match self {
            StorageBackend::Local(b) => b.store.as_ref(),
            StorageBackend::Memory(m) => m.as_ref(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, StorageBackend::Local(_))
    }

    /// Directory blob names are resolved against, if the backend has one.
    pub fn root(&self) -> Option<&Path> {
        match self {
            StorageBackend::Local(b) => Some(&b.data_dir),
            StorageBackend::Memory(_) => None,
        }
    }
}

/// Local filesystem backend rooted at the application data dir.
pub struct LocalBackend {
    pub store: Arc<dyn ObjectStore>,
    pub data_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let canonical = std::fs::canonicalize(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
        let store = LocalFileSystem::new_with_prefix(&canonical)
            .map_err(|e| StorageError::Other(format!("local filesystem error: {e}")))?;
        info!("Storage: local backend at {}", canonical.display());
        Ok(Self {
            store: Arc::new(store),
            data_dir: canonical,
        })
    }
}
