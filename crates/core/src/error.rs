use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("document type is empty after normalization")]
    EmptyDocumentType,

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
