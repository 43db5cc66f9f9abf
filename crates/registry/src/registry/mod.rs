//! Document registry: keeps `documents` rows and uploaded blobs consistent.
//!
//! Every mutating operation is an ordered sequence of store writes with a
//! compensating step at each failure point:
//!
//! ```text
//! upload:  write blob -> lookup type -> update row | insert row -> drop old blob
//!              |             |                |             |
//!              x           drop new blob   drop new blob  drop new blob
//! delete:  lookup id -> delete row -> drop blob (missing blob is fine)
//! ```
//!
//! A row is never visible without its blob. A blob without a row (an orphan)
//! is tolerated, logged, and removed by [`DocumentRegistry::sweep_orphans`].


use std::collections::HashSet;

use bytes::Bytes;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use docvault_core::{Config, DocumentId, DocumentRecord, ListOrder};
use docvault_storage::{generate_blob_name, BlobStore, ObjectBlobStore, StorageEngine, StorageError};

use crate::error::RegistryError;
use crate::repository::{
    DocumentRepository, NewDocument, RepositoryError, SqliteDocumentRepository,
};
use crate::validation::{validate_id, validate_upload, UploadRequest};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// First upload for this document type.
    Created { record: DocumentRecord },
    /// Existing record now points at the new file.
    Replaced {
        record: DocumentRecord,
        previous_file_path: String,
    },
}

impl UploadOutcome {
    pub fn record(&self) -> &DocumentRecord {
        match self {
            Self::Created { record } | Self::Replaced { record, .. } => record,
        }
    }

    pub fn into_record(self) -> DocumentRecord {
        match self {
            Self::Created { record } | Self::Replaced { record, .. } => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// The registry, generic over its two stores so tests can inject fakes.
pub struct DocumentRegistry<B, R> {
    blobs: B,
    repo: R,
    upload_dir: String,
}

impl<B, R> DocumentRegistry<B, R>
where
    B: BlobStore,
    R: DocumentRepository,
{
    /// `upload_dir` is the blob-name prefix new uploads are stored under.
    pub fn new(blobs: B, repo: R, upload_dir: impl Into<String>) -> Self {
        Self {
            blobs,
            repo,
            upload_dir: upload_dir.into().trim_matches('/').to_string(),
        }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn upload_dir(&self) -> &str {
        &self.upload_dir
    }

    // ── Upload ──────────────────────────────────────────────────

    /// Store a document, creating the record for its type or replacing the
    /// file of the existing one.
    pub async fn upload(&self, req: UploadRequest) -> Result<UploadOutcome, RegistryError> {
        let upload = validate_upload(req)?;
        let blob_name = generate_blob_name(&self.upload_dir, &upload.extension);
        let size = upload.content.len();

        if let Err(e) = self.blobs.write(&blob_name, upload.content).await {
            error!(blob = %blob_name, "failed to write upload: {}", e);
            return Err(RegistryError::StorageWriteFailed(e.to_string()));
        }

        let doc = NewDocument {
            document_type: upload.document_type,
            file_path: blob_name,
            original_filename: upload.original_filename,
            upload_timestamp: Utc::now(),
        };

        match self.commit_upload(&doc).await {
            Ok(outcome) => {
                info!(
                    id = outcome.record().id,
                    document_type = %doc.document_type,
                    file = %doc.file_path,
                    size,
                    created = outcome.is_created(),
                    "document stored"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.discard_blob(&doc.file_path).await;
                Err(e)
            }
        }
    }

    /// Database half of an upload. The new blob already exists; on error the
    /// caller removes it.
    async fn commit_upload(&self, doc: &NewDocument) -> Result<UploadOutcome, RegistryError> {
        let existing = self
            .repo
            .find_by_type(&doc.document_type)
            .await
            .map_err(read_error)?;

        if let Some(existing) = existing {
            match self.repo.update_file(existing.id, doc).await {
                Ok(Some(record)) => {
                    self.remove_replaced_blob(&existing.file_path).await;
                    return Ok(UploadOutcome::Replaced {
                        record,
                        previous_file_path: existing.file_path,
                    });
                }
                Ok(None) => {
                    warn!(
                        id = existing.id,
                        document_type = %doc.document_type,
                        "record deleted during replace; inserting instead"
                    );
                }
                Err(e) => return Err(write_error(e)),
            }
        }

        match self.repo.insert(doc).await {
            Ok(record) => Ok(UploadOutcome::Created { record }),
            Err(RepositoryError::UniqueViolation(_)) => {
                warn!(
                    document_type = %doc.document_type,
                    "concurrent upload created this type first"
                );
                Err(RegistryError::DuplicateType(doc.document_type.to_string()))
            }
            Err(e) => Err(write_error(e)),
        }
    }

    /// Old file of a replaced record. The new state is already committed, so
    /// a failure here only leaves an orphan.
    async fn remove_replaced_blob(&self, file_path: &str) {
        if let Err(e) = self.blobs.delete(file_path).await {
            warn!(blob = %file_path, "failed to remove replaced file, left as orphan: {}", e);
        }
    }

    /// Undo a blob write after the database half of an upload failed.
    async fn discard_blob(&self, file_path: &str) {
        if let Err(e) = self.blobs.delete(file_path).await {
            warn!(blob = %file_path, "failed to discard uncommitted upload, left as orphan: {}", e);
        }
    }

    // ── Read ────────────────────────────────────────────────────

    pub async fn list(&self, order: ListOrder) -> Result<Vec<DocumentRecord>, RegistryError> {
        self.repo.list(order).await.map_err(read_error)
    }

    pub async fn get(&self, id: DocumentId) -> Result<DocumentRecord, RegistryError> {
        let id = validate_id(id)?;
        self.repo
            .find_by_id(id)
            .await
            .map_err(read_error)?
            .ok_or_else(|| not_found(id))
    }

    /// Record plus file content, for viewing or downloading.
    pub async fn open(&self, id: DocumentId) -> Result<(DocumentRecord, Bytes), RegistryError> {
        let record = self.get(id).await?;
        match self.blobs.read(&record.file_path).await {
            Ok(content) => Ok((record, content)),
            Err(e) if e.is_not_found() => {
                error!(id, blob = %record.file_path, "record points at a missing file");
                Err(RegistryError::NotFound(format!("file for document {id}")))
            }
            Err(e) => Err(storage_unavailable(e)),
        }
    }

    // ── Delete ──────────────────────────────────────────────────

    /// Remove a record and its file. Returns the removed record.
    pub async fn delete(&self, id: DocumentId) -> Result<DocumentRecord, RegistryError> {
        let id = validate_id(id)?;
        let record = self
            .repo
            .find_by_id(id)
            .await
            .map_err(read_error)?
            .ok_or_else(|| not_found(id))?;

        let removed = self.repo.delete(id).await.map_err(write_error)?;
        if !removed {
            return Err(not_found(id));
        }

        if let Err(e) = self.blobs.delete(&record.file_path).await {
            warn!(id, blob = %record.file_path, "record deleted but file removal failed: {}", e);
        }

        info!(id, document_type = %record.document_type, "document deleted");
        Ok(record)
    }

    // ── Maintenance ─────────────────────────────────────────────

    /// Delete blobs in the upload dir that no record references.
    ///
    /// Blobs modified within `grace` are skipped: they may belong to an
    /// upload whose row is not committed yet.
    pub async fn sweep_orphans(&self, grace: Duration) -> Result<Vec<String>, RegistryError> {
        let referenced: HashSet<String> = self
            .list(ListOrder::History)
            .await?
            .into_iter()
            .map(|r| r.file_path)
            .collect();

        let cutoff = Utc::now() - grace;
        let blobs = self
            .blobs
            .list(&self.upload_dir)
            .await
            .map_err(storage_unavailable)?;

        let mut removed = Vec::new();
        for blob in blobs {
            if referenced.contains(&blob.name) || blob.last_modified > cutoff {
                continue;
            }
            match self.blobs.delete(&blob.name).await {
                Ok(()) => removed.push(blob.name),
                Err(e) => warn!(blob = %blob.name, "failed to remove orphan: {}", e),
            }
        }

        if !removed.is_empty() {
            info!(count = removed.len(), "removed orphaned files");
        }
        Ok(removed)
    }
}

/// Production registry: local files under the data dir plus SQLite.
pub type SqliteRegistry = DocumentRegistry<ObjectBlobStore, SqliteDocumentRepository>;

impl SqliteRegistry {
    /// Open both stores from config, creating directories and applying
    /// migrations as needed.
    pub async fn connect(config: &Config) -> Result<Self, RegistryError> {
        let (blobs, upload_dir) = StorageEngine::from_config(config)
            .map_err(storage_unavailable)?
            .into_parts();
        let repo = SqliteDocumentRepository::connect(&config.database)
            .await
            .map_err(read_error)?;
        Ok(Self::new(blobs, repo, upload_dir))
    }

    /// Drain the connection pool.
    pub async fn close(&self) {
        self.repo.close().await;
    }
}

fn not_found(id: DocumentId) -> RegistryError {
    RegistryError::NotFound(format!("document {id}"))
}

/// Failures on read paths all mean the store could not answer.
fn read_error(e: RepositoryError) -> RegistryError {
    error!("document store read failed: {}", e);
    RegistryError::StorageUnavailable(e.to_string())
}

/// Failures on write paths: only a unique violation has its own kind.
fn write_error(e: RepositoryError) -> RegistryError {
    match e {
        RepositoryError::UniqueViolation(kind) => RegistryError::DuplicateType(kind),
        other => RegistryError::StorageWriteFailed(other.to_string()),
    }
}

fn storage_unavailable(e: StorageError) -> RegistryError {
    error!("blob store failed: {}", e);
    RegistryError::StorageUnavailable(e.to_string())
}
