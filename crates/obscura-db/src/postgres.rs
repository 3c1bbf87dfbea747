use async_trait::async_trait;
use chrono::{DateTime, Utc};
use obscura_core::models::{FileStatus, Owner, StoredFile};
use obscura_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{check_transition, FileRepository, StatusUpdate};

#[derive(sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    owner_id: Option<Uuid>,
    original_name: String,
    stored_name: String,
    derived_name: Option<String>,
    size_bytes: i64,
    derived_size_bytes: Option<i64>,
    mime_type: String,
    status: FileStatus,
    error_message: Option<String>,
    uploaded_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<FileRow> for StoredFile {
    fn from(row: FileRow) -> Self {
        StoredFile {
            id: row.id,
            owner: Owner::from(row.owner_id),
            original_name: row.original_name,
            stored_name: row.stored_name,
            derived_name: row.derived_name,
            size_bytes: row.size_bytes,
            derived_size_bytes: row.derived_size_bytes,
            mime_type: row.mime_type,
            status: row.status,
            error_message: row.error_message,
            uploaded_at: row.uploaded_at,
            processed_at: row.processed_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, owner_id, original_name, stored_name, derived_name, \
     size_bytes, derived_size_bytes, mime_type, status, error_message, \
     uploaded_at, processed_at";

/// Postgres-backed record store.
#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    #[tracing::instrument(skip(self, file), fields(file_id = %file.id))]
    async fn create(&self, file: &StoredFile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO files (
                id, owner_id, original_name, stored_name, derived_name,
                size_bytes, derived_size_bytes, mime_type, status, error_message,
                uploaded_at, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(file.id)
        .bind(file.owner.user_id())
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(&file.derived_name)
        .bind(file.size_bytes)
        .bind(file.derived_size_bytes)
        .bind(&file.mime_type)
        .bind(file.status)
        .bind(&file.error_message)
        .bind(file.uploaded_at)
        .bind(file.processed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<StoredFile>, AppError> {
        let row: Option<FileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM files WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredFile::from))
    }

    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<StoredFile>, AppError> {
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM files WHERE owner_id = $1 ORDER BY uploaded_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredFile::from).collect())
    }

    async fn list_all(&self) -> Result<Vec<StoredFile>, AppError> {
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM files ORDER BY uploaded_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredFile::from).collect())
    }

    #[tracing::instrument(skip(self, update), fields(file_id = %id, status = %update.status))]
    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<StoredFile, AppError> {
        // Transition check and update run in one transaction so a concurrent
        // writer cannot slip a state change in between.
        let mut tx = self.pool.begin().await?;

        let current: Option<FileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM files WHERE id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = current.ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;
        check_transition(id, current.status, update.status)?;

        let row: FileRow = match update.status {
            FileStatus::Completed => {
                sqlx::query_as(&format!(
                    r#"
                    UPDATE files
                    SET status = $2, derived_name = $3, derived_size_bytes = $4,
                        processed_at = NOW(), error_message = NULL
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    SELECT_COLUMNS
                ))
                .bind(id)
                .bind(update.status)
                .bind(&update.derived_name)
                .bind(update.derived_size_bytes)
                .fetch_one(&mut *tx)
                .await?
            }
            FileStatus::Failed => {
                sqlx::query_as(&format!(
                    "UPDATE files SET status = $2, error_message = $3, processed_at = NOW() \
                     WHERE id = $1 RETURNING {}",
                    SELECT_COLUMNS
                ))
                .bind(id)
                .bind(update.status)
                .bind(&update.error_message)
                .fetch_one(&mut *tx)
                .await?
            }
            // Processing: stamp the start time; a prior failure's message is
            // kept until the next terminal transition overwrites it.
            _ => {
                sqlx::query_as(&format!(
                    "UPDATE files SET status = $2, processed_at = NOW() WHERE id = $1 RETURNING {}",
                    SELECT_COLUMNS
                ))
                .bind(id)
                .bind(update.status)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(StoredFile::from(row))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("File {} not found", id)));
        }
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AppError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}
