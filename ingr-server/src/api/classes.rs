//! Class endpoints

use crate::services::classes::{self, ClassDetail, ClassUpsert};
use crate::services::WriteMode;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

/// GET /classes/
pub async fn list_classes(State(state): State<AppState>) -> ApiResult<Json<Vec<ClassDetail>>> {
    Ok(Json(classes::list_classes(&state.db).await?))
}

/// GET /classes/:id
pub async fn get_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<ClassDetail>> {
    Ok(Json(classes::get_class(&state.db, &class_id).await?))
}

/// POST /classes/:id (create or update)
pub async fn upsert_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Json(req): Json<ClassUpsert>,
) -> ApiResult<Json<ClassDetail>> {
    Ok(Json(
        classes::upsert_class(&state.db, &class_id, &req, WriteMode::Upsert).await?,
    ))
}

/// PUT /classes/:id (existing classes only)
pub async fn update_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Json(req): Json<ClassUpsert>,
) -> ApiResult<Json<ClassDetail>> {
    Ok(Json(
        classes::upsert_class(&state.db, &class_id, &req, WriteMode::UpdateExisting).await?,
    ))
}

/// DELETE /classes/:id
pub async fn delete_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<Value>> {
    classes::delete_class(&state.db, &class_id).await?;
    Ok(Json(json!({ "message": format!("Class {} deleted", class_id) })))
}

/// Build class routes
pub fn class_routes() -> Router<AppState> {
    Router::new()
        .route("/classes", get(list_classes))
        .route("/classes/", get(list_classes))
        .route(
            "/classes/:class_id",
            get(get_class)
                .post(upsert_class)
                .put(update_class)
                .delete(delete_class),
        )
}
