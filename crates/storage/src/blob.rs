//! Content store for uploaded documents.
//!
//! Blobs are addressed by generated names relative to the application root
//! (e.g. `uploads/license_doc_<token>.pdf`). The same string is what the
//! registry persists as a record's `file_path`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::PutPayload;
use tracing::debug;
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Prefix of every generated blob file name.
pub const BLOB_NAME_PREFIX: &str = "license_doc_";

/// Listing entry for a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub name: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Storage operations the registry depends on.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `content` under `name`, replacing nothing (names are fresh).
    async fn write(&self, name: &str, content: Bytes) -> Result<(), StorageError>;

    async fn read(&self, name: &str) -> Result<Bytes, StorageError>;

    /// Remove a blob. Removing a missing blob succeeds.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// All blobs under `prefix`, sorted by name.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StorageError>;
}

/// Build a collision-resistant blob name inside `dir`, keeping `extension`.
pub fn generate_blob_name(dir: &str, extension: &str) -> String {
    let token = Uuid::new_v4().simple();
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        format!("{BLOB_NAME_PREFIX}{token}.{extension}")
    } else {
        format!("{dir}/{BLOB_NAME_PREFIX}{token}.{extension}")
    }
}

fn object_path(name: &str) -> Result<ObjectPath, StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    ObjectPath::parse(name).map_err(|_| StorageError::InvalidName(name.to_string()))
}

/// [`BlobStore`] over an object_store backend.
pub struct ObjectBlobStore {
    backend: StorageBackend,
}

impl ObjectBlobStore {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    /// Volatile store for tests and dry runs.
    pub fn in_memory() -> Self {
        Self::new(StorageBackend::Memory(std::sync::Arc::new(
            object_store::memory::InMemory::new(),
        )))
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn write(&self, name: &str, content: Bytes) -> Result<(), StorageError> {
        let path = object_path(name)?;
        let size = content.len();
        self.backend
            .store()
            .put(&path, PutPayload::from(content))
            .await?;
        debug!(blob = %name, size, "blob written");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Bytes, StorageError> {
        let path = object_path(name)?;
        match self.backend.store().get(&path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(StorageError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = object_path(name)?;
        match self.backend.store().delete(&path).await {
            Ok(()) => {
                debug!(blob = %name, "blob deleted");
                Ok(())
            }
            Err(object_store::Error::NotFound { .. }) => {
                debug!(blob = %name, "blob already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let path = object_path(name)?;
        match self.backend.store().head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StorageError> {
        let prefix = prefix.trim_matches('/');
        let prefix_path = if prefix.is_empty() {
            None
        } else {
            Some(object_path(prefix)?)
        };
        let mut blobs: Vec<BlobMeta> = self
            .backend
            .store()
            .list(prefix_path.as_ref())
            .map_ok(|meta| BlobMeta {
                name: meta.location.to_string(),
                size: meta.size as u64,
                last_modified: meta.last_modified,
            })
            .try_collect()
            .await?;
        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }
}
