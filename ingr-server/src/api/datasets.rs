//! Dataset endpoints

use crate::services::datasets::{self, DatasetDeletion, DatasetDetail, DatasetUpsert};
use crate::services::WriteMode;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

/// GET /datasets/
pub async fn list_datasets(State(state): State<AppState>) -> ApiResult<Json<Vec<DatasetDetail>>> {
    Ok(Json(datasets::list_datasets(&state.db).await?))
}

/// POST /datasets/
pub async fn create_dataset(
    State(state): State<AppState>,
    Json(req): Json<DatasetUpsert>,
) -> ApiResult<Json<DatasetDetail>> {
    Ok(Json(datasets::create_dataset(&state.db, &req).await?))
}

/// GET /datasets/:id
pub async fn get_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
) -> ApiResult<Json<DatasetDetail>> {
    Ok(Json(datasets::get_dataset(&state.db, &dataset_id).await?))
}

/// POST /datasets/:id
pub async fn upsert_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    Json(req): Json<DatasetUpsert>,
) -> ApiResult<Json<DatasetDetail>> {
    Ok(Json(
        datasets::upsert_dataset(&state.db, &dataset_id, &req, WriteMode::Upsert).await?,
    ))
}

/// PUT /datasets/:id
pub async fn update_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    Json(req): Json<DatasetUpsert>,
) -> ApiResult<Json<DatasetDetail>> {
    Ok(Json(
        datasets::upsert_dataset(&state.db, &dataset_id, &req, WriteMode::UpdateExisting).await?,
    ))
}

/// DELETE /datasets/:id
///
/// Images and classes owned only by this dataset go with it.
pub async fn delete_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
) -> ApiResult<Json<DatasetDeletion>> {
    Ok(Json(datasets::delete_dataset(&state.db, &dataset_id).await?))
}

/// Build dataset routes
pub fn dataset_routes() -> Router<AppState> {
    Router::new()
        .route("/datasets", get(list_datasets).post(create_dataset))
        .route("/datasets/", get(list_datasets).post(create_dataset))
        .route(
            "/datasets/:dataset_id",
            get(get_dataset)
                .post(upsert_dataset)
                .put(update_dataset)
                .delete(delete_dataset),
        )
}
