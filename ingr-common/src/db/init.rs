//! Database initialization
//!
//! Opens (or creates) the SQLite store and creates every table idempotently.
//! Link tables carry `ON DELETE CASCADE` on both sides, so a link row can
//! never outlive either endpoint.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory store with the full schema
///
/// Limited to a single connection that is never recycled: every SQLite
/// `:memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Entity tables
    create_datasets_table(pool).await?;
    create_classes_table(pool).await?;
    create_images_table(pool).await?;
    create_projects_table(pool).await?;

    // Linking tables
    create_dataset_images_table(pool).await?;
    create_dataset_classes_table(pool).await?;
    create_class_images_table(pool).await?;
    create_project_datasets_table(pool).await?;

    // Per-image rows
    create_bounding_boxes_table(pool).await?;
    create_keypoints_table(pool).await?;
    create_segmentations_table(pool).await?;
    create_image_features_table(pool).await?;

    Ok(())
}

async fn create_datasets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            uploaded_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_classes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL DEFAULT '',
            file_location TEXT NOT NULL DEFAULT '',
            thumbnail_location TEXT NOT NULL DEFAULT '',
            width INTEGER NOT NULL DEFAULT 0,
            height INTEGER NOT NULL DEFAULT 0,
            media_type TEXT NOT NULL DEFAULT '',
            size INTEGER NOT NULL DEFAULT 0,
            approval TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            labeled_by TEXT NOT NULL DEFAULT '',
            edited_by TEXT NOT NULL DEFAULT '',
            uploaded_by TEXT NOT NULL DEFAULT '',
            properties TEXT NOT NULL DEFAULT '{"description":"","comment":""}',
            uploaded_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_dataset_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_images (
            dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            PRIMARY KEY (dataset_id, image_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_dataset_images_image ON dataset_images(image_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_dataset_classes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_classes (
            dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            class_id TEXT NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
            PRIMARY KEY (dataset_id, class_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_dataset_classes_class ON dataset_classes(class_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_class_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS class_images (
            class_id TEXT NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
            image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            PRIMARY KEY (class_id, image_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_class_images_image ON class_images(image_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_project_datasets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_datasets (
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            PRIMARY KEY (project_id, dataset_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bounding_boxes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bounding_boxes (
            id TEXT PRIMARY KEY,
            image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            class_id TEXT REFERENCES classes(id) ON DELETE SET NULL,
            x_min REAL NOT NULL DEFAULT 0,
            y_min REAL NOT NULL DEFAULT 0,
            x_max REAL NOT NULL DEFAULT 0,
            y_max REAL NOT NULL DEFAULT 0,
            confidence REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bounding_boxes_image ON bounding_boxes(image_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_keypoints_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS keypoints (
            id TEXT PRIMARY KEY,
            image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            class_id TEXT REFERENCES classes(id) ON DELETE SET NULL,
            x REAL NOT NULL DEFAULT 0,
            y REAL NOT NULL DEFAULT 0,
            confidence REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_keypoints_image ON keypoints(image_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_segmentations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS segmentations (
            id TEXT PRIMARY KEY,
            image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            class_id TEXT REFERENCES classes(id) ON DELETE SET NULL,
            mask TEXT NOT NULL DEFAULT '',
            confidence REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_segmentations_image ON segmentations(image_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Model-derived feature rows
///
/// `model_id` names a file under `<upload_root>/models/`; models have no table.
async fn create_image_features_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS image_features (
            image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            model_id TEXT NOT NULL,
            feature_id TEXT NOT NULL DEFAULT '',
            feature_int_id INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            PRIMARY KEY (image_id, model_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
