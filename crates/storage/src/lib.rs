pub mod backend;
pub mod blob;
pub mod error;

use std::path::PathBuf;

use tracing::info;

pub use backend::{LocalBackend, StorageBackend};
pub use blob::{generate_blob_name, BlobMeta, BlobStore, ObjectBlobStore, BLOB_NAME_PREFIX};
pub use error::StorageError;

/// Config-driven blob storage: local backend rooted at the data dir.
pub struct StorageEngine {
    pub blobs: ObjectBlobStore,
    pub data_dir: PathBuf,
    /// Upload directory relative to `data_dir`; prefix of every blob name.
    pub upload_dir: String,
}

impl StorageEngine {
    pub fn from_config(config: &docvault_core::Config) -> Result<Self, StorageError> {
        let data_dir = config.storage.data_dir.clone();
        std::fs::create_dir_all(config.storage.upload_path())?;
        let local = LocalBackend::new(&data_dir)?;
        info!(
            "Storage: uploads in {}",
            local.data_dir.join(&config.storage.upload_dir).display()
        );
        Ok(Self {
            blobs: ObjectBlobStore::new(StorageBackend::Local(local)),
            data_dir,
            upload_dir: config.storage.upload_dir.clone(),
        })
    }

    pub fn into_parts(self) -> (ObjectBlobStore, String) {
        (self.blobs, self.upload_dir)
    }
}
