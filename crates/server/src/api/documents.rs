//! Document endpoints: list, upload, fetch, download, delete.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use docvault_core::{DocumentId, ListOrder};
use docvault_registry::{ErrorKind, UploadOutcome, UploadRequest};

use super::{api_err, registry_err, ApiError, ApiResult, DocumentView};
use crate::state::AppState;

/// Multipart field carrying the document type label.
pub const TYPE_FIELD: &str = "document_type";
/// Multipart field carrying the PDF.
pub const FILE_FIELD: &str = "document_file";

#[derive(Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub document: DocumentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_file_path: Option<String>,
}

fn parse_id(raw: &str) -> ApiResult<DocumentId> {
    raw.parse().map_err(|_| {
        api_err(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidInput,
            format!("document id must be a positive integer, got '{raw}'"),
        )
    })
}

fn multipart_err(e: MultipartError) -> ApiError {
    let status = e.status();
    let kind = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorKind::FileTooLarge
    } else {
        ErrorKind::InvalidInput
    };
    api_err(status, kind, e.body_text())
}

/// Collect the two upload fields; unknown fields are ignored.
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadRequest> {
    let mut document_type = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            TYPE_FIELD => document_type = Some(field.text().await.map_err(multipart_err)?),
            FILE_FIELD => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(multipart_err)?;
                file = Some((filename, content));
            }
            _ => {}
        }
    }

    let (filename, content) = file.ok_or_else(|| {
        api_err(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidInput,
            format!("no file uploaded (expected field '{FILE_FIELD}')"),
        )
    })?;
    Ok(UploadRequest::new(
        document_type.unwrap_or_default(),
        filename,
        content,
    ))
}

/// GET /documents
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DocumentView>>> {
    let records = state
        .registry
        .list(ListOrder::Catalog)
        .await
        .map_err(registry_err)?;
    Ok(Json(records.iter().map(DocumentView::from).collect()))
}

/// GET /documents/history
pub async fn list_history(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DocumentView>>> {
    let records = state
        .registry
        .list(ListOrder::History)
        .await
        .map_err(registry_err)?;
    Ok(Json(records.iter().map(DocumentView::from).collect()))
}

/// POST /documents: 201 for a new type, 200 when the type's file was replaced.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let req = read_upload(multipart).await?;
    let outcome = state.registry.upload(req).await.map_err(registry_err)?;

    let (status, response) = match &outcome {
        UploadOutcome::Created { record } => (
            StatusCode::CREATED,
            UploadResponse {
                status: "created",
                document: record.into(),
                previous_file_path: None,
            },
        ),
        UploadOutcome::Replaced { record, previous_file_path } => (
            StatusCode::OK,
            UploadResponse {
                status: "replaced",
                document: record.into(),
                previous_file_path: Some(previous_file_path.clone()),
            },
        ),
    };
    Ok((status, Json(response)))
}

/// GET /documents/{id}
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentView>> {
    let id = parse_id(&id)?;
    let record = state.registry.get(id).await.map_err(registry_err)?;
    Ok(Json(DocumentView::from(&record)))
}

/// GET /documents/{id}/file: the PDF, for inline viewing.
pub async fn document_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let (record, content) = state.registry.open(id).await.map_err(registry_err)?;

    // Header values must be visible ASCII.
    let filename: String = record
        .original_filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"')
        .collect();
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, content).into_response())
}

/// DELETE /documents/{id}
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentView>> {
    let id = parse_id(&id)?;
    let record = state.registry.delete(id).await.map_err(registry_err)?;
    Ok(Json(DocumentView::from(&record)))
}
