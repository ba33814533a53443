//! Upload endpoints
//!
//! All bodies are `multipart/form-data`, the way the annotation client
//! posts them: `file` for the payload, `session_id` and repeated `file_ids`
//! as text fields.

use crate::assets::{self, MovedAsset, StoredAsset};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

/// Upper bound for a single upload request
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Text fields and the optional file part of a multipart body
#[derive(Debug, Default)]
struct UploadForm {
    fields: Vec<(String, String)>,
    file: Option<(String, Bytes)>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                form.file = Some((filename, bytes));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                form.fields.push((name, value));
            }
        }

        Ok(form)
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All values of a repeated field; `file_ids[]` is accepted for `file_ids`
    fn all(&self, name: &str) -> Vec<String> {
        let bracketed = format!("{}[]", name);
        self.fields
            .iter()
            .filter(|(key, _)| key == name || *key == bracketed)
            .map(|(_, value)| value.clone())
            .filter(|value| !value.is_empty())
            .collect()
    }

    fn session_id(&self) -> ApiResult<String> {
        match self.first("session_id").map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(ApiError::BadRequest("session_id is required".to_string())),
        }
    }

    fn take_file(&mut self) -> ApiResult<(String, Bytes)> {
        self.file
            .take()
            .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))
    }
}

/// Run filesystem work on the blocking pool
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> ingr_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// POST /uploads/upload-file
///
/// Stores the file permanently and derives its thumbnail in one step.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<StoredAsset>> {
    let mut form = UploadForm::read(multipart).await?;
    let (filename, bytes) = form.take_file()?;

    let layout = state.layout.clone();
    let stored = blocking(move || assets::store_direct(&layout, &filename, &bytes)).await?;

    Ok(Json(stored))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedResponse {
    pub file_id: String,
    pub filename: String,
    pub temp_location: String,
}

/// POST /uploads/upload-temp
pub async fn upload_temp(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<StagedResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let session_id = form.session_id()?;
    let (filename, bytes) = form.take_file()?;

    let layout = state.layout.clone();
    let staged =
        blocking(move || assets::stage_file(&layout, &session_id, &filename, &bytes)).await?;

    Ok(Json(StagedResponse {
        file_id: staged.file_id,
        filename: staged.filename,
        temp_location: staged.path.display().to_string(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub status: &'static str,
    pub moved_files: Vec<MovedAsset>,
}

/// POST /uploads/commit-uploads
pub async fn commit_uploads(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<CommitResponse>> {
    let form = UploadForm::read(multipart).await?;
    let session_id = form.first("session_id").unwrap_or_default().trim().to_string();
    let file_ids = form.all("file_ids");

    if session_id.is_empty() || file_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "session_id and file_ids are required".to_string(),
        ));
    }

    info!(session_id = %session_id, files = file_ids.len(), "Commit requested");

    let layout = state.layout.clone();
    let moved = blocking(move || assets::commit(&layout, &session_id, &file_ids)).await?;

    Ok(Json(CommitResponse {
        status: "ok",
        moved_files: moved,
    }))
}

/// DELETE /uploads/cancel-uploads
pub async fn cancel_uploads(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let form = UploadForm::read(multipart).await?;
    let session_id = form.session_id()?;

    let layout = state.layout.clone();
    blocking(move || assets::cancel(&layout, &session_id)).await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// GET /uploads/download/*path
///
/// Streams a file stored under the upload root.
pub async fn download_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let file_path = state.layout.resolve_download(&path)?;

    let is_file = tokio::fs::metadata(&file_path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::NotFound(format!("File {}", path)));
    }

    let response = ServeFile::new(&file_path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to serve {}: {}", path, e)))?;

    Ok(response.map(Body::new).into_response())
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/upload-file", post(upload_file))
        .route("/uploads/upload-temp", post(upload_temp))
        .route("/uploads/commit-uploads", post(commit_uploads))
        .route("/uploads/cancel-uploads", delete(cancel_uploads))
        .route("/uploads/download/*path", get(download_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
