//! Input checks for registry operations.
//!
//! Callers may pass raw user input; nothing reaches the stores until it has
//! been through here.

use bytes::Bytes;

use docvault_core::{file_basename, file_extension, DocumentId, DocumentType};

use crate::error::RegistryError;

/// Largest accepted upload (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Only PDFs are accepted; compared case-insensitively.
pub const ALLOWED_EXTENSION: &str = "pdf";

/// Raw upload as received from a caller.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub document_type: String,
    pub original_filename: String,
    pub content: Bytes,
    /// Size reported by the caller (e.g. the multipart part length).
    pub size_bytes: u64,
}

impl UploadRequest {
    /// Build a request whose reported size is the content length.
    pub fn new(
        document_type: impl Into<String>,
        original_filename: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            document_type: document_type.into(),
            original_filename: original_filename.into(),
            size_bytes: content.len() as u64,
            content,
        }
    }

    pub fn with_reported_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }
}

/// An upload that passed every check.
#[derive(Debug)]
pub(crate) struct ValidatedUpload {
    pub document_type: DocumentType,
    /// Basename of the uploader's filename.
    pub original_filename: String,
    /// Extension as supplied, reused for the stored blob name.
    pub extension: String,
    pub content: Bytes,
}

pub(crate) fn validate_upload(req: UploadRequest) -> Result<ValidatedUpload, RegistryError> {
    let document_type = DocumentType::parse(&req.document_type)
        .map_err(|_| RegistryError::InvalidInput("document type is required".into()))?;

    let original_filename = file_basename(req.original_filename.trim()).to_string();
    let extension = match file_extension(&original_filename) {
        Some(ext) if ext.eq_ignore_ascii_case(ALLOWED_EXTENSION) => ext.to_string(),
        Some(ext) => return Err(RegistryError::UnsupportedFileType(ext.to_string())),
        None => return Err(RegistryError::UnsupportedFileType(original_filename)),
    };

    let size = req.size_bytes.max(req.content.len() as u64);
    if size > MAX_UPLOAD_BYTES {
        return Err(RegistryError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(ValidatedUpload {
        document_type,
        original_filename,
        extension,
        content: req.content,
    })
}

pub(crate) fn validate_id(id: DocumentId) -> Result<DocumentId, RegistryError> {
    if id <= 0 {
        return Err(RegistryError::InvalidInput(format!(
            "document id must be a positive integer, got {id}"
        )));
    }
    Ok(id)
}
