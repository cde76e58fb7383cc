use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreError;

/// One persisted CSV row.
#[derive(Debug, Clone, FromRow)]
pub struct CsvUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCsvUser {
    pub name: String,
    pub email: String,
    pub age: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// No row was stored, or the file did not parse.
    Failed,
    Partial,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Failed => "failed",
            UploadStatus::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "failed" => Some(UploadStatus::Failed),
            "partial" => Some(UploadStatus::Partial),
            _ => None,
        }
    }

    pub fn from_counts(success_count: usize) -> Self {
        if success_count > 0 {
            UploadStatus::Partial
        } else {
            UploadStatus::Failed
        }
    }
}

/// Rejected row: 1-based file line (header is line 1) and messages per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub details: BTreeMap<String, String>,
}

/// Audit record of an upload that did not fully succeed.
#[derive(Debug, Clone)]
pub struct CsvUploadError {
    pub id: Uuid,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub status: UploadStatus,
    pub total_rows: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub errors: Vec<RowError>,
    pub parse_error: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Raw `csv_upload_errors` row.
#[derive(Debug, FromRow)]
pub struct CsvUploadErrorRow {
    pub id: Uuid,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub status: String,
    pub total_rows: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub errors: Json<Vec<RowError>>,
    pub parse_error: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<CsvUploadErrorRow> for CsvUploadError {
    type Error = StoreError;

    fn try_from(r: CsvUploadErrorRow) -> Result<Self, Self::Error> {
        let status = UploadStatus::parse(&r.status)
            .ok_or_else(|| StoreError::Decode(format!("unknown upload status '{}'", r.status)))?;
        Ok(Self {
            id: r.id,
            original_name: r.original_name,
            mime_type: r.mime_type,
            size: r.size,
            status,
            total_rows: r.total_rows,
            success_count: r.success_count,
            error_count: r.error_count,
            errors: r.errors.0,
            parse_error: r.parse_error,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUploadError {
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub status: UploadStatus,
    pub total_rows: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub errors: Vec<RowError>,
    pub parse_error: Option<String>,
}
