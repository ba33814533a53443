//! Integration tests for the upload pipeline
//!
//! Stage -> commit -> cancel over HTTP, the single-shot upload with
//! thumbnail derivation, and downloads from the upload root.

mod helpers;

use axum::http::StatusCode;
use helpers::{body_bytes, empty_request, multipart_request, png_bytes, TestApp};
use image::GenericImageView;
use std::path::Path;

async fn stage(app: &TestApp, session_id: &str, filename: &str, bytes: &[u8]) -> String {
    let (status, json) = app
        .call(multipart_request(
            "POST",
            "/uploads/upload-temp",
            &[("session_id", session_id)],
            Some((filename, bytes)),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "stage failed: {}", json);
    assert_eq!(json["filename"], filename);
    json["fileId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_stage_commit_then_cancel() {
    let app = TestApp::new().await;
    let file_id = stage(&app, "s1", "photo.png", b"raw bytes").await;

    let (status, json) = app
        .call(multipart_request(
            "POST",
            "/uploads/commit-uploads",
            &[("session_id", "s1"), ("file_ids", file_id.as_str())],
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    let moved = json["movedFiles"].as_array().unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0]["id"], file_id.as_str());
    assert_eq!(moved[0]["filename"], "photo.png");

    let final_path = app.layout.images_dir().join(format!("{}_photo.png", file_id));
    assert_eq!(moved[0]["fileLocation"], final_path.display().to_string());
    assert!(final_path.exists());

    // Cancelling afterwards leaves the committed file alone
    let (status, json) = app
        .call(multipart_request(
            "DELETE",
            "/uploads/cancel-uploads",
            &[("session_id", "s1")],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(final_path.exists());
}

#[tokio::test]
async fn test_repeat_commit_moves_nothing() {
    let app = TestApp::new().await;
    let file_id = stage(&app, "s1", "a.png", b"a").await;
    let commit = || {
        multipart_request(
            "POST",
            "/uploads/commit-uploads",
            &[("session_id", "s1"), ("file_ids", file_id.as_str())],
            None,
        )
    };

    let (_, first) = app.call(commit()).await;
    let (status, second) = app.call(commit()).await;

    assert_eq!(first["movedFiles"].as_array().unwrap().len(), 1);
    assert_eq!(status, StatusCode::OK);
    assert!(second["movedFiles"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_reports_only_matched_ids() {
    let app = TestApp::new().await;
    let a = stage(&app, "s1", "a.png", b"a").await;
    let b = stage(&app, "s1", "b.png", b"b").await;

    let (status, json) = app
        .call(multipart_request(
            "POST",
            "/uploads/commit-uploads",
            &[
                ("session_id", "s1"),
                ("file_ids", a.as_str()),
                ("file_ids", "not-staged"),
                ("file_ids", b.as_str()),
            ],
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["movedFiles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![a.as_str(), b.as_str()]);
}

#[tokio::test]
async fn test_commit_requires_session_and_ids() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(multipart_request(
            "POST",
            "/uploads/commit-uploads",
            &[("session_id", "s1")],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(multipart_request(
            "POST",
            "/uploads/commit-uploads",
            &[("file_ids", "x")],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stage_requires_session_id() {
    let app = TestApp::new().await;

    let (status, json) = app
        .call(multipart_request(
            "POST",
            "/uploads/upload-temp",
            &[("session_id", "")],
            Some(("a.png", &b"a"[..])),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("session_id"));
}

#[tokio::test]
async fn test_cancel_leaves_no_trace() {
    let app = TestApp::new().await;
    stage(&app, "s1", "a.png", b"a").await;
    stage(&app, "s1", "b.png", b"b").await;

    let (status, _) = app
        .call(multipart_request(
            "DELETE",
            "/uploads/cancel-uploads",
            &[("session_id", "s1")],
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(std::fs::read_dir(app.layout.tmp_root()).unwrap().count(), 0);

    // Cancelling again is not an error
    let (status, _) = app
        .call(multipart_request(
            "DELETE",
            "/uploads/cancel-uploads",
            &[("session_id", "s1")],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upload_file_stores_asset_and_thumbnail() {
    let app = TestApp::new().await;
    let png = png_bytes(640, 480);

    let (status, json) = app
        .call(multipart_request(
            "POST",
            "/uploads/upload-file",
            &[],
            Some(("scan.png", png.as_slice())),
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "upload failed: {}", json);
    assert_eq!(json["filename"], "scan.png");
    assert_eq!(json["width"], 640);
    assert_eq!(json["height"], 480);
    assert_eq!(json["type"], "image/png");

    let id = json["id"].as_str().unwrap();
    let stored = app.layout.images_dir().join(format!("{}_scan.png", id));
    assert!(stored.exists());

    let thumbnail = json["thumbnailLocation"].as_str().unwrap();
    let thumb = image::open(Path::new(thumbnail)).unwrap();
    assert_eq!(thumb.dimensions(), (150, 150));
}

#[tokio::test]
async fn test_upload_file_sniffs_format_from_content() {
    let app = TestApp::new().await;
    let png = png_bytes(64, 48);

    let (status, json) = app
        .call(multipart_request(
            "POST",
            "/uploads/upload-file",
            &[],
            Some(("photo.jpg", png.as_slice())),
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "upload failed: {}", json);
    assert_eq!(json["filename"], "photo.jpg");
    assert_eq!(json["width"], 64);
    assert_eq!(json["height"], 48);
    assert_eq!(json["type"], "image/png");

    let thumbnail = json["thumbnailLocation"].as_str().unwrap();
    assert!(Path::new(thumbnail).exists());
}

#[tokio::test]
async fn test_upload_file_rejects_undecodable_image() {
    let app = TestApp::new().await;

    let (status, json) = app
        .call(multipart_request(
            "POST",
            "/uploads/upload-file",
            &[],
            Some(("notes.png", &b"plain text"[..])),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "ASSET_ERROR");
}

#[tokio::test]
async fn test_upload_file_requires_file_part() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(multipart_request("POST", "/uploads/upload-file", &[], None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_serves_stored_file() {
    let app = TestApp::new().await;
    std::fs::write(app.layout.images_dir().join("x_doc.txt"), b"hello").unwrap();

    let response = app
        .send(empty_request("GET", "/uploads/download/images/x_doc.txt"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"hello");
}

#[tokio::test]
async fn test_download_missing_and_traversal() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(empty_request("GET", "/uploads/download/images/absent.png"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(empty_request("GET", "/uploads/download/images/../../secret"))
        .await;
    assert!(
        status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND,
        "traversal must not be served, got {}",
        status
    );
}
