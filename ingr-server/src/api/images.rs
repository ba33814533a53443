//! Image endpoints

use super::query_values;
use crate::services::images::{self, ImageDeletion, ImageDetail, ImageUpsert};
use crate::services::WriteMode;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

/// GET /images/?dataset_ids=a&dataset_ids=b
pub async fn list_images(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<ImageDetail>>> {
    let dataset_ids = query_values(&params, "dataset_ids");
    Ok(Json(images::list_images(&state.db, &dataset_ids).await?))
}

/// GET /images/:id
pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> ApiResult<Json<ImageDetail>> {
    Ok(Json(images::get_image(&state.db, &image_id).await?))
}

/// POST /images/:id
///
/// Creates or updates the image. `datasetIds`/`classIds` are reconciled
/// only when present in the body.
pub async fn upsert_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Json(req): Json<ImageUpsert>,
) -> ApiResult<Json<ImageDetail>> {
    let detail = images::upsert_image(&state.db, &image_id, &req, WriteMode::Upsert).await?;
    Ok(Json(detail))
}

/// DELETE /images/:id?selected_dataset_ids=a
pub async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ImageDeletion>> {
    let scope = query_values(&params, "selected_dataset_ids");
    Ok(Json(images::delete_image(&state.db, &image_id, &scope).await?))
}

/// Build image routes
pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images))
        .route("/images/", get(list_images))
        .route(
            "/images/:image_id",
            get(get_image).post(upsert_image).delete(delete_image),
        )
}
