//! HTTP handlers. Shared response types and error mapping live here.

mod documents;
mod health;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use docvault_core::{DocumentId, DocumentRecord};
use docvault_registry::{ErrorKind, RegistryError};

// ── Shared types ─────────────────────────────────────────────────

/// Error body for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

/// A stored document as rendered to clients.
#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub document_type: String,
    pub label: String,
    pub original_filename: String,
    pub file_path: String,
    pub upload_date: String,
}

impl From<&DocumentRecord> for DocumentView {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            id: record.id,
            document_type: record.document_type.to_string(),
            label: record.display_label(),
            original_filename: record.original_filename.clone(),
            file_path: record.file_path.clone(),
            upload_date: record.upload_date(),
        }
    }
}

/// Map a registry error to its HTTP response.
pub(crate) fn registry_err(e: RegistryError) -> ApiError {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            kind: e.kind(),
        }),
    )
}

pub(crate) fn api_err(status: StatusCode, kind: ErrorKind, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            kind,
        }),
    )
}

// ── Re-exports ───────────────────────────────────────────────────

pub use documents::{
    delete_document, document_file, get_document, list_documents, list_history, upload_document,
};
pub use health::health;
