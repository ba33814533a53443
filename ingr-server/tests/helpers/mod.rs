//! Test Helper Utilities
//!
//! Shared setup for ingr-server integration tests: an app over an in-memory
//! store and temporary asset roots, plus request/response helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use image::RgbImage;
use ingr_server::assets::AssetLayout;
use ingr_server::plugins::PluginRunner;
use ingr_server::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "ingr-test-boundary";

/// Plugin runner that echoes its arguments
pub struct EchoRunner;

#[async_trait]
impl PluginRunner for EchoRunner {
    async fn run(&self, plugin: &str, input: &str) -> ingr_common::Result<String> {
        Ok(format!("{}:{}", plugin, input))
    }
}

/// Router plus handles on everything behind it
///
/// `root` must be kept alive for the duration of the test.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub layout: AssetLayout,
    pub root: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let layout = AssetLayout::new(root.path().join("static"), root.path().join(".tmp"));
        layout.ensure_dirs().unwrap();

        let plugins_dir = root.path().join("plugins");
        std::fs::create_dir_all(&plugins_dir).unwrap();

        let pool = ingr_common::db::init_memory_database().await.unwrap();
        let state = AppState::new(pool.clone(), layout.clone(), Arc::new(EchoRunner), plugins_dir);

        Self {
            router: build_router(state),
            pool,
            layout,
            root,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send and decode a JSON response
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        let bytes = body_bytes(response).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn seed_dataset(&self, id: &str) {
        sqlx::query(
            "INSERT INTO datasets (id, name, description, uploaded_at, updated_at) VALUES (?, ?, '', 'now', 'now')",
        )
        .bind(id)
        .bind(id)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    pub async fn seed_class(&self, id: &str) {
        sqlx::query("INSERT INTO classes (id, name, color, created_at) VALUES (?, ?, '#fff', 'now')")
            .bind(id)
            .bind(id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn seed_image(&self, id: &str) {
        sqlx::query("INSERT INTO images (id, filename, uploaded_at, updated_at) VALUES (?, ?, 'now', 'now')")
            .bind(id)
            .bind(format!("{}.png", id))
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn link_image(&self, dataset_id: &str, image_id: &str) {
        sqlx::query("INSERT INTO dataset_images (dataset_id, image_id) VALUES (?, ?)")
            .bind(dataset_id)
            .bind(image_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&self.pool).await.unwrap()
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a `multipart/form-data` request from text fields and an optional file
pub fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Encode a solid-color PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, image::Rgb([30, 60, 90]))
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}
