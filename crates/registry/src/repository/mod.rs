//! Relational side of the registry: the `documents` table.
//!
//! [`DocumentRepository`] is the seam the registry is built against;
//! [`SqliteDocumentRepository`] is the production implementation.

mod error;
mod sqlite;

pub use error::RepositoryError;
pub use sqlite::SqliteDocumentRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use docvault_core::{DocumentId, DocumentRecord, DocumentType, ListOrder};

/// Column values for an insert or a replace.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub document_type: DocumentType,
    pub file_path: String,
    pub original_filename: String,
    pub upload_timestamp: DateTime<Utc>,
}

/// Transactional access to document rows. Uniqueness of `document_type` is
/// enforced by the store, not by callers.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_type(
        &self,
        document_type: &DocumentType,
    ) -> Result<Option<DocumentRecord>, RepositoryError>;

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>, RepositoryError>;

    /// Insert a new row. Fails with [`RepositoryError::UniqueViolation`] if the
    /// type is already present.
    async fn insert(&self, doc: &NewDocument) -> Result<DocumentRecord, RepositoryError>;

    /// Point an existing row at a new file in one statement. `Ok(None)` if no
    /// row has this id anymore.
    async fn update_file(
        &self,
        id: DocumentId,
        doc: &NewDocument,
    ) -> Result<Option<DocumentRecord>, RepositoryError>;

    /// Delete a row. Returns whether a row was actually removed.
    async fn delete(&self, id: DocumentId) -> Result<bool, RepositoryError>;

    async fn list(&self, order: ListOrder) -> Result<Vec<DocumentRecord>, RepositoryError>;
}
