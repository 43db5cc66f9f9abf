use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{error, info};

use docvault_core::config::DatabaseConfig;
use docvault_core::{
    format_upload_date, parse_upload_date, CoreError, DocumentId, DocumentRecord, DocumentType,
    ListOrder,
};

use super::{DocumentRepository, NewDocument, RepositoryError};

const SELECT_COLUMNS: &str = "id, document_type, file_path, original_filename, upload_date";

/// Raw `documents` row as stored.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    document_type: String,
    file_path: String,
    original_filename: String,
    upload_date: String,
}

impl TryFrom<DocumentRow> for DocumentRecord {
    type Error = CoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        if row.file_path.is_empty() {
            return Err(CoreError::InvalidRecord(format!("row {} has an empty file_path", row.id)));
        }
        Ok(DocumentRecord {
            id: row.id,
            document_type: DocumentType::parse(&row.document_type)?,
            file_path: row.file_path,
            original_filename: row.original_filename,
            upload_timestamp: parse_upload_date(&row.upload_date)?,
        })
    }
}

fn into_records(rows: Vec<DocumentRow>) -> Result<Vec<DocumentRecord>, RepositoryError> {
    rows.into_iter()
        .map(|row| DocumentRecord::try_from(row).map_err(RepositoryError::from))
        .collect()
}

/// `documents` table in SQLite, accessed through a sqlx pool.
#[derive(Clone)]
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    /// Open (creating if needed) the database and apply migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(RepositoryError::Unavailable)?
            .create_if_missing(true);

        if !config.is_in_memory() {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| RepositoryError::Unavailable(sqlx::Error::Io(e)))?;
                }
            }
        }

        let mut pool_options = SqlitePoolOptions::new();
        if config.is_in_memory() {
            // The database lives only as long as its connection.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(config.max_connections.max(1));
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(RepositoryError::Unavailable)?;
        info!("SQLite connected: {}", config.url);

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Wrap an existing pool. Call [`migrate`](Self::migrate) before use.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied successfully");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn find_by_type(
        &self,
        document_type: &DocumentType,
    ) -> Result<Option<DocumentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE document_type = ?1"
        ))
        .bind(document_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRecord::try_from).transpose().map_err(Into::into)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRecord::try_from).transpose().map_err(Into::into)
    }

    async fn insert(&self, doc: &NewDocument) -> Result<DocumentRecord, RepositoryError> {
        let result = sqlx::query_as::<_, DocumentRow>(&format!(
            "INSERT INTO documents (document_type, file_path, original_filename, upload_date)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(doc.document_type.as_str())
        .bind(&doc.file_path)
        .bind(&doc.original_filename)
        .bind(format_upload_date(&doc.upload_timestamp))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(DocumentRecord::try_from(row)?),
            Err(e) => {
                let err = RepositoryError::from_sqlx(e, Some(doc.document_type.as_str()));
                if !matches!(err, RepositoryError::UniqueViolation(_)) {
                    error!("document insert failed: {}", err);
                }
                Err(err)
            }
        }
    }

    async fn update_file(
        &self,
        id: DocumentId,
        doc: &NewDocument,
    ) -> Result<Option<DocumentRecord>, RepositoryError> {
        let result = sqlx::query_as::<_, DocumentRow>(&format!(
            "UPDATE documents
             SET file_path = ?2, original_filename = ?3, upload_date = ?4
             WHERE id = ?1
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(&doc.file_path)
        .bind(&doc.original_filename)
        .bind(format_upload_date(&doc.upload_timestamp))
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row.map(DocumentRecord::try_from).transpose().map_err(Into::into),
            Err(e) => {
                error!("document update failed for id {}: {}", id, e);
                Err(RepositoryError::from_sqlx(e, Some(doc.document_type.as_str())))
            }
        }
    }

    async fn delete(&self, id: DocumentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, order: ListOrder) -> Result<Vec<DocumentRecord>, RepositoryError> {
        let order_by = match order {
            ListOrder::Catalog => "document_type ASC, upload_date DESC",
            ListOrder::History => "upload_date DESC, id DESC",
        };
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents ORDER BY {order_by}"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    async fn memory_repo() -> SqliteDocumentRepository {
        let config = DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 4,
        };
        SqliteDocumentRepository::connect(&config).await.unwrap()
    }

    fn new_doc(kind: &str, path: &str, hour: u32) -> NewDocument {
        NewDocument {
            document_type: DocumentType::parse(kind).unwrap(),
            file_path: path.to_string(),
            original_filename: format!("{kind}.pdf"),
            upload_timestamp: Utc.with_ymd_and_hms(2025, 6, 14, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_and_find() {
        let repo = memory_repo().await;
        let inserted = repo.insert(&new_doc("radio permit", "uploads/a.pdf", 9)).await.unwrap();
        assert!(inserted.id > 0);
        assert_eq!(inserted.document_type.as_str(), "radio_permit");
        assert_eq!(inserted.upload_date(), "2025-06-14 09:00:00");

        let by_type = repo
            .find_by_type(&DocumentType::parse("Radio Permit").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_type, inserted);

        let by_id = repo.find_by_id(inserted.id).await.unwrap().unwrap();
        assert_eq!(by_id, inserted);
        assert!(repo.find_by_id(inserted.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_type_is_unique_violation() {
        let repo = memory_repo().await;
        repo.insert(&new_doc("passport", "uploads/a.pdf", 9)).await.unwrap();
        let err = repo.insert(&new_doc("Passport", "uploads/b.pdf", 10)).await.unwrap_err();
        match err {
            RepositoryError::UniqueViolation(kind) => assert_eq!(kind, "passport"),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_file_keeps_id() {
        let repo = memory_repo().await;
        let first = repo.insert(&new_doc("passport", "uploads/a.pdf", 9)).await.unwrap();
        let updated = repo
            .update_file(first.id, &new_doc("passport", "uploads/b.pdf", 11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.file_path, "uploads/b.pdf");
        assert_eq!(updated.upload_date(), "2025-06-14 11:00:00");

        let missing = repo
            .update_file(first.id + 1, &new_doc("passport", "uploads/c.pdf", 12))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went_away() {
        let repo = memory_repo().await;
        let doc = repo.insert(&new_doc("passport", "uploads/a.pdf", 9)).await.unwrap();
        assert!(repo.delete(doc.id).await.unwrap());
        assert!(!repo.delete(doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = memory_repo().await;
        let a = repo.insert(&new_doc("a", "uploads/a.pdf", 9)).await.unwrap();
        let b = repo.insert(&new_doc("b", "uploads/b.pdf", 9)).await.unwrap();
        repo.delete(b.id).await.unwrap();
        let c = repo.insert(&new_doc("c", "uploads/c.pdf", 9)).await.unwrap();
        assert!(c.id > b.id);
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn list_orders() {
        let repo = memory_repo().await;
        repo.insert(&new_doc("zoning", "uploads/z.pdf", 8)).await.unwrap();
        repo.insert(&new_doc("alarm", "uploads/a.pdf", 7)).await.unwrap();
        repo.insert(&new_doc("medical", "uploads/m.pdf", 12)).await.unwrap();

        let catalog: Vec<String> = repo
            .list(ListOrder::Catalog)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.document_type.to_string())
            .collect();
        assert_eq!(catalog, vec!["alarm", "medical", "zoning"]);

        let history: Vec<String> = repo
            .list(ListOrder::History)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.document_type.to_string())
            .collect();
        assert_eq!(history, vec!["medical", "zoning", "alarm"]);
    }

    #[tokio::test]
    async fn connect_creates_database_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("licenses.sqlite");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 2,
        };
        let repo = SqliteDocumentRepository::connect(&config).await.unwrap();
        assert!(db_path.exists());
        assert!(repo.list(ListOrder::History).await.unwrap().is_empty());
        repo.close().await;
    }
}
