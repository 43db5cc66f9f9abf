use serde::Serialize;
use thiserror::Error;

/// Discriminant of [`RegistryError`], stable for callers that render messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedFileType,
    FileTooLarge,
    StorageWriteFailed,
    StorageUnavailable,
    DuplicateType,
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::UnsupportedFileType => "unsupported_file_type",
            Self::FileTooLarge => "file_too_large",
            Self::StorageWriteFailed => "storage_write_failed",
            Self::StorageUnavailable => "storage_unavailable",
            Self::DuplicateType => "duplicate_type",
            Self::NotFound => "not_found",
        }
    }
}

/// Errors returned by every registry operation.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported file type '{0}': only PDF files are allowed")]
    UnsupportedFileType(String),

    #[error("file size {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("failed to store document: {0}")]
    StorageWriteFailed(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("a document of type '{0}' already exists")]
    DuplicateType(String),

    #[error("document not found: {0}")]
    NotFound(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::UnsupportedFileType(_) => ErrorKind::UnsupportedFileType,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::StorageWriteFailed(_) => ErrorKind::StorageWriteFailed,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::DuplicateType(_) => ErrorKind::DuplicateType,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Map to an HTTP status code for API responses.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::DuplicateType => 409,
            ErrorKind::FileTooLarge => 413,
            ErrorKind::UnsupportedFileType => 415,
            ErrorKind::StorageWriteFailed => 500,
            ErrorKind::StorageUnavailable => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_status_codes() {
        let cases = [
            (RegistryError::InvalidInput("x".into()), "invalid_input", 400),
            (RegistryError::UnsupportedFileType("txt".into()), "unsupported_file_type", 415),
            (RegistryError::FileTooLarge { size: 11, limit: 10 }, "file_too_large", 413),
            (RegistryError::StorageWriteFailed("disk".into()), "storage_write_failed", 500),
            (RegistryError::StorageUnavailable("db".into()), "storage_unavailable", 503),
            (RegistryError::DuplicateType("passport".into()), "duplicate_type", 409),
            (RegistryError::NotFound("document 7".into()), "not_found", 404),
        ];
        for (err, kind, status) in cases {
            assert_eq!(err.kind().as_str(), kind);
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnsupportedFileType).unwrap();
        assert_eq!(json, "\"unsupported_file_type\"");
    }

    #[test]
    fn messages_carry_context() {
        let err = RegistryError::FileTooLarge { size: 11_000_000, limit: 10_485_760 };
        assert!(err.to_string().contains("11000000"));
        let err = RegistryError::DuplicateType("radio_permit".into());
        assert!(err.to_string().contains("radio_permit"));
    }
}
