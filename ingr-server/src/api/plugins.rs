//! Plugin endpoints

use crate::plugins::{self, PluginInfo};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct PluginList {
    pub plugins: Vec<PluginInfo>,
}

#[derive(Debug, Deserialize)]
pub struct RunPluginRequest {
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct RunPluginResponse {
    pub result: String,
}

/// GET /plugins
pub async fn list_plugins(State(state): State<AppState>) -> ApiResult<Json<PluginList>> {
    let dir = state.plugins_dir.clone();
    let plugins = tokio::task::spawn_blocking(move || plugins::list_plugins(&dir))
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))??;
    Ok(Json(PluginList { plugins }))
}

/// POST /plugin/:name
pub async fn run_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RunPluginRequest>,
) -> ApiResult<Json<RunPluginResponse>> {
    let result = state.plugins.run(&name, &req.input).await?;
    Ok(Json(RunPluginResponse { result }))
}

/// Build plugin routes
pub fn plugin_routes() -> Router<AppState> {
    Router::new()
        .route("/plugins", get(list_plugins))
        .route("/plugin/:name", post(run_plugin))
}
