use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::csv_import::repo_types::{
    CsvUploadError, CsvUploadErrorRow, CsvUser, NewCsvUser, NewUploadError,
};
use crate::db::StoreError;

#[async_trait]
pub trait CsvUserRepo: Send + Sync {
    async fn insert(&self, new: NewCsvUser) -> Result<CsvUser, StoreError>;
    async fn list(&self) -> Result<Vec<CsvUser>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CsvUser>, StoreError>;
    async fn delete_all(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait UploadErrorRepo: Send + Sync {
    async fn insert(&self, new: NewUploadError) -> Result<CsvUploadError, StoreError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<CsvUploadError>, StoreError>;
}

const CSV_USER_COLUMNS: &str = "id, name, email, age, created_at";
const UPLOAD_ERROR_COLUMNS: &str = "id, original_name, mime_type, size, status, total_rows, \
     success_count, error_count, errors, parse_error, created_at";

#[derive(Clone)]
pub struct PgCsvUserRepo {
    db: PgPool,
}

impl PgCsvUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CsvUserRepo for PgCsvUserRepo {
    async fn insert(&self, new: NewCsvUser) -> Result<CsvUser, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO csv_users (name, email, age)
            VALUES ($1, $2, $3)
            RETURNING {CSV_USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CsvUser>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(new.age)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<CsvUser>, StoreError> {
        let sql = format!("SELECT {CSV_USER_COLUMNS} FROM csv_users ORDER BY created_at ASC");
        let rows = sqlx::query_as::<_, CsvUser>(&sql)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CsvUser>, StoreError> {
        let sql = format!("SELECT {CSV_USER_COLUMNS} FROM csv_users WHERE id = $1");
        let row = sqlx::query_as::<_, CsvUser>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM csv_users")
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PgUploadErrorRepo {
    db: PgPool,
}

impl PgUploadErrorRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UploadErrorRepo for PgUploadErrorRepo {
    async fn insert(&self, new: NewUploadError) -> Result<CsvUploadError, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO csv_upload_errors
                (original_name, mime_type, size, status, total_rows,
                 success_count, error_count, errors, parse_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {UPLOAD_ERROR_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CsvUploadErrorRow>(&sql)
            .bind(&new.original_name)
            .bind(&new.mime_type)
            .bind(new.size)
            .bind(new.status.as_str())
            .bind(new.total_rows)
            .bind(new.success_count)
            .bind(new.error_count)
            .bind(Json(&new.errors))
            .bind(&new.parse_error)
            .fetch_one(&self.db)
            .await?
            .try_into()
    }

    async fn list(&self) -> Result<Vec<CsvUploadError>, StoreError> {
        let sql = format!(
            "SELECT {UPLOAD_ERROR_COLUMNS} FROM csv_upload_errors ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, CsvUploadErrorRow>(&sql)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(CsvUploadError::try_from)
            .collect()
    }
}
