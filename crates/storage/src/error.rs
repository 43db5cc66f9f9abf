use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob name '{0}'")]
    InvalidName(String),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_)
                | StorageError::ObjectStore(object_store::Error::NotFound { .. })
        )
    }
}
