use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    csv_import::dto::{
        CsvUserResponse, DeleteAllResponse, UploadErrorResponse, UploadResult, UploadedFile,
    },
    error::{AppError, AppResult},
    state::AppState,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10MB
const FILE_FIELD: &str = "file";

pub fn csv_routes() -> Router<AppState> {
    Router::new()
        .route("/csv-uploader", get(list_uploaded))
        .route("/csv-uploader/errors", get(list_failed_uploads))
        .route("/csv-uploader/delete-all-files", delete(delete_all_uploaded))
        .route("/csv-uploader/:id", get(get_uploaded))
        .merge(upload_router())
}

fn upload_router() -> Router<AppState> {
    Router::new()
        .route("/csv-uploader/upload-file", post(upload_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// 201 when every row was stored, 207 when some were, 400 when none of the
/// rows present could be stored.
pub fn upload_status(result: &UploadResult) -> StatusCode {
    match (result.success.is_empty(), result.errors.is_empty()) {
        (_, true) => StatusCode::CREATED,
        (false, false) => StatusCode::MULTI_STATUS,
        (true, false) => StatusCode::BAD_REQUEST,
    }
}

/// POST /csv-uploader/upload-file (multipart, field `file`)
///
/// A body that is not multipart at all counts as a missing file.
#[instrument(skip(state, _caller, mp))]
pub async fn upload_file(
    State(state): State<AppState>,
    _caller: AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<UploadResult>)> {
    let mut mp = match mp {
        Ok(mp) => mp,
        Err(rejection) => {
            warn!(error = %rejection, "upload without multipart body");
            return Err(AppError::BadRequest("CSV file not provided".into()));
        }
    };

    let mut file = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload.csv").to_string();
        let mime_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "text/csv".into());
        let bytes = field.bytes().await.map_err(|e| {
            warn!(error = %e, "failed to read upload");
            AppError::BadRequest(format!("failed to read file: {e}"))
        })?;
        file = Some(UploadedFile {
            size: bytes.len(),
            bytes,
            original_name,
            mime_type,
        });
        break;
    }

    let result = state.csv.process_upload(file).await?;
    Ok((upload_status(&result), Json(result)))
}

#[instrument(skip(state, _caller))]
pub async fn list_uploaded(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> AppResult<Json<Vec<CsvUserResponse>>> {
    Ok(Json(state.csv.list_uploaded().await?))
}

#[instrument(skip(state, _caller))]
pub async fn get_uploaded(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CsvUserResponse>> {
    Ok(Json(state.csv.get_uploaded(id).await?))
}

#[instrument(skip(state, _caller))]
pub async fn list_failed_uploads(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> AppResult<Json<Vec<UploadErrorResponse>>> {
    Ok(Json(state.csv.list_failed_uploads().await?))
}

#[instrument(skip(state, _caller))]
pub async fn delete_all_uploaded(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> AppResult<Json<DeleteAllResponse>> {
    Ok(Json(state.csv.delete_all_uploaded().await?))
}
