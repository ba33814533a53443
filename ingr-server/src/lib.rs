//! ingr-server library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod assets;
pub mod error;
pub mod labels;
pub mod plugins;
pub mod relations;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::assets::AssetLayout;
use crate::plugins::PluginRunner;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Permanent and staging roots
    pub layout: AssetLayout,
    /// Executes plugins for `POST /plugin/:name`
    pub plugins: Arc<dyn PluginRunner>,
    /// Scanned by `GET /plugins`
    pub plugins_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        layout: AssetLayout,
        plugins: Arc<dyn PluginRunner>,
        plugins_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            layout,
            plugins,
            plugins_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// The upload root is also served read-only under `/static`.
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.layout.upload_root());

    Router::new()
        .merge(api::upload_routes())
        .merge(api::dataset_routes())
        .merge(api::class_routes())
        .merge(api::image_routes())
        .merge(api::label_routes())
        .merge(api::project_routes())
        .merge(api::plugin_routes())
        .merge(api::health_routes())
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
