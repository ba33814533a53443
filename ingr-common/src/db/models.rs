//! Database models
//!
//! Row types shared by the services and the HTTP layer. JSON field names are
//! camelCase, matching what the annotation client sends and expects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

/// Default free-form properties document for a new image
pub fn default_image_properties() -> Value {
    serde_json::json!({ "description": "", "comment": "" })
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub uploaded_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub filename: String,
    pub file_location: String,
    pub thumbnail_location: String,
    pub width: i64,
    pub height: i64,
    #[serde(rename = "type")]
    pub media_type: String,
    pub size: i64,
    pub approval: String,
    pub comment: String,
    pub labeled_by: String,
    pub edited_by: String,
    pub uploaded_by: String,
    pub properties: Json<Value>,
    pub uploaded_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub id: String,
    pub image_id: String,
    pub class_id: Option<String>,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub confidence: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct KeyPoint {
    pub id: String,
    pub image_id: String,
    pub class_id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    pub id: String,
    pub image_id: String,
    pub class_id: Option<String>,
    /// Encoded mask (JSON polygon, RLE, ...); stored verbatim
    pub mask: String,
    pub confidence: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_serializes_media_type_as_type() {
        let image = Image {
            id: "img1".to_string(),
            filename: "photo.png".to_string(),
            file_location: "static/images/x_photo.png".to_string(),
            thumbnail_location: "static/thumbnails/x_photo.png".to_string(),
            width: 640,
            height: 480,
            media_type: "image/png".to_string(),
            size: 1024,
            approval: String::new(),
            comment: String::new(),
            labeled_by: String::new(),
            edited_by: String::new(),
            uploaded_by: String::new(),
            properties: Json(default_image_properties()),
            uploaded_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        };

        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["fileLocation"], "static/images/x_photo.png");
        assert_eq!(json["properties"]["description"], "");
        assert!(json.get("mediaType").is_none());
    }
}
