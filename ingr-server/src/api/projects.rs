//! Project endpoints

use crate::services::projects::{self, ProjectDetail, ProjectUpsert};
use crate::services::WriteMode;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// GET /projects/
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectDetail>>> {
    Ok(Json(projects::list_projects(&state.db).await?))
}

/// POST /projects/:id
pub async fn upsert_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<ProjectUpsert>,
) -> ApiResult<Json<ProjectDetail>> {
    Ok(Json(
        projects::upsert_project(&state.db, &project_id, &req, WriteMode::Upsert).await?,
    ))
}

/// DELETE /projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Value>> {
    projects::delete_project(&state.db, &project_id).await?;
    Ok(Json(json!({ "message": format!("Project {} deleted", project_id) })))
}

/// Build project routes
pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/", get(list_projects))
        .route("/projects/:project_id", post(upsert_project).delete(delete_project))
}
