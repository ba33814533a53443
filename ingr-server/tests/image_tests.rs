//! Integration tests for image records and the deletion policy

mod helpers;

use axum::http::StatusCode;
use helpers::{empty_request, json_request, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_upsert_creates_with_default_properties() {
    let app = TestApp::new().await;
    app.seed_dataset("dsA").await;

    let (status, json) = app
        .call(json_request(
            "POST",
            "/images/img1",
            json!({
                "filename": "photo.png",
                "fileLocation": "static/images/img1_photo.png",
                "width": 640,
                "height": 480,
                "type": "image/png",
                "size": 2048,
                "datasetIds": ["dsA"]
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["id"], "img1");
    assert_eq!(json["type"], "image/png");
    assert_eq!(json["properties"], json!({ "description": "", "comment": "" }));
    assert_eq!(json["datasetIds"], json!(["dsA"]));
    assert_eq!(json["classIds"], json!([]));
}

#[tokio::test]
async fn test_upsert_updates_only_supplied_fields() {
    let app = TestApp::new().await;
    app.seed_dataset("dsA").await;
    app.seed_class("c1").await;

    app.call(json_request(
        "POST",
        "/images/img1",
        json!({ "filename": "photo.png", "width": 10, "datasetIds": ["dsA"], "classIds": ["c1"] }),
    ))
    .await;

    let (status, json) = app
        .call(json_request(
            "POST",
            "/images/img1",
            json!({ "approval": "approved", "properties": { "description": "street" } }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filename"], "photo.png");
    assert_eq!(json["width"], 10);
    assert_eq!(json["approval"], "approved");
    assert_eq!(json["properties"]["description"], "street");
    // Relations absent from the body stay as they were
    assert_eq!(json["datasetIds"], json!(["dsA"]));
    assert_eq!(json["classIds"], json!(["c1"]));
}

#[tokio::test]
async fn test_get_missing_image_is_404() {
    let app = TestApp::new().await;

    let (status, json) = app.call(empty_request("GET", "/images/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_filters_by_dataset() {
    let app = TestApp::new().await;
    for ds in ["dsA", "dsB", "dsC"] {
        app.seed_dataset(ds).await;
    }
    for img in ["img1", "img2", "img3"] {
        app.seed_image(img).await;
    }
    app.link_image("dsA", "img1").await;
    app.link_image("dsB", "img2").await;
    app.link_image("dsA", "img2").await;
    app.link_image("dsC", "img3").await;

    let (status, json) = app
        .call(empty_request(
            "GET",
            "/images/?dataset_ids=dsA&dataset_ids=dsB",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let mut listed: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|img| img["id"].as_str().unwrap())
        .collect();
    listed.sort();
    assert_eq!(listed, vec!["img1", "img2"]);

    let (_, all) = app.call(empty_request("GET", "/images/")).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_scoped_delete_removes_image_linked_only_there() {
    let app = TestApp::new().await;
    app.seed_dataset("dsA").await;
    app.seed_image("img1").await;
    app.link_image("dsA", "img1").await;

    let (status, json) = app
        .call(empty_request(
            "DELETE",
            "/images/img1?selected_dataset_ids=dsA",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);
    assert_eq!(app.count("SELECT COUNT(*) FROM images").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM dataset_images").await, 0);
}

#[tokio::test]
async fn test_scoped_delete_keeps_image_shared_elsewhere() {
    let app = TestApp::new().await;
    app.seed_dataset("dsA").await;
    app.seed_dataset("dsB").await;
    app.seed_image("img1").await;
    app.link_image("dsA", "img1").await;
    app.link_image("dsB", "img1").await;

    let (status, json) = app
        .call(empty_request(
            "DELETE",
            "/images/img1?selected_dataset_ids=dsA",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], false);
    assert_eq!(json["unlinkedDatasetIds"], json!(["dsA"]));
    assert_eq!(app.count("SELECT COUNT(*) FROM images").await, 1);

    let (_, image) = app.call(empty_request("GET", "/images/img1")).await;
    assert_eq!(image["datasetIds"], json!(["dsB"]));
}

#[tokio::test]
async fn test_unscoped_delete_removes_files_and_labels() {
    let app = TestApp::new().await;
    app.seed_dataset("dsA").await;

    let file = app.layout.images_dir().join("img1_photo.png");
    let thumb = app.layout.thumbnails_dir().join("img1_photo.png");
    std::fs::write(&file, b"x").unwrap();
    std::fs::write(&thumb, b"x").unwrap();

    app.call(json_request(
        "POST",
        "/images/img1",
        json!({
            "filename": "photo.png",
            "fileLocation": file.display().to_string(),
            "thumbnailLocation": thumb.display().to_string(),
            "datasetIds": ["dsA"]
        }),
    ))
    .await;
    app.call(json_request(
        "POST",
        "/labels/",
        json!({ "imageId": "img1", "keyPoints": [{ "x": 1.0, "y": 2.0 }] }),
    ))
    .await;

    let (status, json) = app.call(empty_request("DELETE", "/images/img1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);
    assert!(!file.exists());
    assert!(!thumb.exists());
    assert_eq!(app.count("SELECT COUNT(*) FROM keypoints").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM dataset_images").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM datasets").await, 1);
}

#[tokio::test]
async fn test_delete_succeeds_when_files_already_gone() {
    let app = TestApp::new().await;

    app.call(json_request(
        "POST",
        "/images/img1",
        json!({
            "fileLocation": "/nonexistent/img1.png",
            "thumbnailLocation": "/nonexistent/thumb.png"
        }),
    ))
    .await;

    let (status, _) = app.call(empty_request("DELETE", "/images/img1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count("SELECT COUNT(*) FROM images").await, 0);
}

#[tokio::test]
async fn test_delete_missing_image_is_404() {
    let app = TestApp::new().await;

    let (status, _) = app.call(empty_request("DELETE", "/images/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
