use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::csv_import::dto::{
    CsvUserResponse, DeleteAllResponse, UploadErrorResponse, UploadResult, UploadedFile,
};
use crate::csv_import::parser::parse_csv;
use crate::csv_import::repo::{CsvUserRepo, UploadErrorRepo};
use crate::csv_import::repo_types::{NewUploadError, RowError, UploadStatus};
use crate::csv_import::validation::validate_row;
use crate::error::{AppError, AppResult};

/// Imports uploaded CSV files row by row and keeps an audit of failures.
pub struct CsvImportService {
    rows: Arc<dyn CsvUserRepo>,
    upload_errors: Arc<dyn UploadErrorRepo>,
}

impl CsvImportService {
    pub fn new(rows: Arc<dyn CsvUserRepo>, upload_errors: Arc<dyn UploadErrorRepo>) -> Self {
        Self {
            rows,
            upload_errors,
        }
    }

    /// Validates and stores each record in file order. Bad rows are reported
    /// rather than aborting the upload.
    pub async fn process_upload(&self, file: Option<UploadedFile>) -> AppResult<UploadResult> {
        let file = file.ok_or_else(|| AppError::BadRequest("CSV file not provided".into()))?;
        info!(
            name = %file.original_name,
            mime = %file.mime_type,
            size = file.size,
            "csv upload received"
        );

        let records = match parse_csv(&file.bytes) {
            Ok(records) => records,
            Err(e) => {
                warn!(name = %file.original_name, error = %e, "csv parse failed");
                self.record_failure(audit(&file, 0, 0, Vec::new(), Some(e.to_string())))
                    .await;
                return Err(AppError::BadRequest(e.to_string()));
            }
        };

        let mut result = UploadResult::default();
        for (i, record) in records.iter().enumerate() {
            let row = i + 2;
            let new = match validate_row(record) {
                Ok(new) => new,
                Err(details) => {
                    result.errors.push(RowError { row, details });
                    continue;
                }
            };
            match self.rows.insert(new).await {
                Ok(saved) => result.success.push(saved.into()),
                Err(e) => {
                    warn!(row, error = %e, "csv row insert failed");
                    let details = BTreeMap::from([("email".to_string(), e.to_string())]);
                    result.errors.push(RowError { row, details });
                }
            }
        }

        if !result.errors.is_empty() {
            self.record_failure(audit(
                &file,
                records.len(),
                result.success.len(),
                result.errors.clone(),
                None,
            ))
            .await;
        }

        info!(
            total = records.len(),
            stored = result.success.len(),
            rejected = result.errors.len(),
            "csv upload processed"
        );
        Ok(result)
    }

    // Audit writes never change the outcome of an upload.
    async fn record_failure(&self, new: NewUploadError) {
        let status = new.status;
        match self.upload_errors.insert(new).await {
            Ok(saved) => debug!(id = %saved.id, status = status.as_str(), "upload failure recorded"),
            Err(e) => error!(error = %e, "failed to record upload failure"),
        }
    }

    pub async fn list_uploaded(&self) -> AppResult<Vec<CsvUserResponse>> {
        let rows = self.rows.list().await?;
        if rows.is_empty() {
            return Err(AppError::NotFound("no uploaded users found".into()));
        }
        Ok(rows.into_iter().map(CsvUserResponse::from).collect())
    }

    pub async fn get_uploaded(&self, id: Uuid) -> AppResult<CsvUserResponse> {
        self.rows
            .find_by_id(id)
            .await?
            .map(CsvUserResponse::from)
            .ok_or_else(|| AppError::NotFound("uploaded user not found".into()))
    }

    pub async fn list_failed_uploads(&self) -> AppResult<Vec<UploadErrorResponse>> {
        let records = self.upload_errors.list().await?;
        if records.is_empty() {
            return Err(AppError::NotFound("no failed uploads found".into()));
        }
        Ok(records.into_iter().map(UploadErrorResponse::from).collect())
    }

    pub async fn delete_all_uploaded(&self) -> AppResult<DeleteAllResponse> {
        let deleted_count = self.rows.delete_all().await?;
        if deleted_count == 0 {
            return Err(AppError::NotFound("no uploaded users to delete".into()));
        }
        info!(deleted_count, "uploaded users deleted");
        Ok(DeleteAllResponse { deleted_count })
    }
}

fn audit(
    file: &UploadedFile,
    total_rows: usize,
    success_count: usize,
    errors: Vec<RowError>,
    parse_error: Option<String>,
) -> NewUploadError {
    NewUploadError {
        original_name: file.original_name.clone(),
        mime_type: file.mime_type.clone(),
        size: file.size as i64,
        status: UploadStatus::from_counts(success_count),
        total_rows: total_rows as i64,
        success_count: success_count as i64,
        error_count: errors.len() as i64,
        errors,
        parse_error,
    }
}
