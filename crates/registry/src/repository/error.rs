use thiserror::Error;

use docvault_core::CoreError;

/// SQLite primary result codes that mean "the store can't serve us right now".
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CANTOPEN: i32 = 14;

/// Errors produced by [`DocumentRepository`](super::DocumentRepository) implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("document type '{0}' already exists")]
    UniqueViolation(String),

    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    CorruptRow(#[from] CoreError),
}

impl RepositoryError {
    /// Classify a driver error. `document_type` names the key a write was for,
    /// so unique violations can report it.
    pub fn from_sqlx(e: sqlx::Error, document_type: Option<&str>) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::UniqueViolation(document_type.unwrap_or_default().to_string())
            }
            sqlx::Error::Database(db_err) => {
                let primary = db_err
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);
                match primary {
                    Some(SQLITE_BUSY | SQLITE_LOCKED | SQLITE_CANTOPEN) => Self::Unavailable(e),
                    _ => Self::Database(e),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(e),
            _ => Self::Database(e),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        Self::from_sqlx(e, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(RepositoryError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(RepositoryError::from(sqlx::Error::PoolClosed).is_unavailable());
    }

    #[test]
    fn row_not_found_is_a_plain_database_error() {
        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(_)));
    }

    #[test]
    fn unique_violation_names_the_type() {
        let err = RepositoryError::UniqueViolation("radio_permit".into());
        assert!(err.to_string().contains("radio_permit"));
    }
}
