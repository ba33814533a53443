//! Label endpoints

use crate::labels::{self, BoundingBoxInput, KeyPointInput, LabelSet, SegmentationInput};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Body of `POST /labels/`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceLabelsRequest {
    #[serde(default, alias = "image_id")]
    pub image_id: String,
    #[serde(default, alias = "bounding_boxes")]
    pub bounding_boxes: Vec<BoundingBoxInput>,
    #[serde(default, alias = "key_points", alias = "keypoints")]
    pub key_points: Vec<KeyPointInput>,
    #[serde(default)]
    pub segmentations: Vec<SegmentationInput>,
}

#[derive(Debug, Deserialize)]
pub struct LabelQuery {
    #[serde(default)]
    pub image_id: String,
}

/// POST /labels/
///
/// Replaces the image's whole label set. Row `imageId`s in the payload are
/// ignored; every row is attached to `imageId`.
pub async fn replace_labels(
    State(state): State<AppState>,
    Json(req): Json<ReplaceLabelsRequest>,
) -> ApiResult<Json<LabelSet>> {
    let set = labels::replace_labels(
        &state.db,
        &req.image_id,
        &req.bounding_boxes,
        &req.key_points,
        &req.segmentations,
    )
    .await?;
    Ok(Json(set))
}

/// GET /labels/?image_id=X
pub async fn list_labels(
    State(state): State<AppState>,
    Query(query): Query<LabelQuery>,
) -> ApiResult<Json<LabelSet>> {
    Ok(Json(labels::list_labels(&state.db, &query.image_id).await?))
}

/// Build label routes
pub fn label_routes() -> Router<AppState> {
    Router::new()
        .route("/labels", get(list_labels).post(replace_labels))
        .route("/labels/", get(list_labels).post(replace_labels))
}
