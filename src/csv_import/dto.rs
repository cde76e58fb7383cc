use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::csv_import::repo_types::{CsvUploadError, CsvUser, RowError, UploadStatus};

/// File part of an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Bytes,
    pub original_name: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvUserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
}

impl From<CsvUser> for CsvUserSummary {
    fn from(u: CsvUser) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            age: u.age,
        }
    }
}

/// Outcome of one upload, in file order.
#[derive(Debug, Default, Serialize)]
pub struct UploadResult {
    pub success: Vec<CsvUserSummary>,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvUserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CsvUser> for CsvUserResponse {
    fn from(u: CsvUser) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            age: u.age,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadErrorResponse {
    pub id: Uuid,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub status: UploadStatus,
    pub total_rows: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub errors: Vec<RowError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CsvUploadError> for UploadErrorResponse {
    fn from(e: CsvUploadError) -> Self {
        Self {
            id: e.id,
            original_name: e.original_name,
            mime_type: e.mime_type,
            size: e.size,
            status: e.status,
            total_rows: e.total_rows,
            success_count: e.success_count,
            error_count: e.error_count,
            errors: e.errors,
            parse_error: e.parse_error,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub deleted_count: u64,
}
