//! Label set replacement
//!
//! An image's labels (boxes, keypoints, segmentations) are only ever written
//! as a complete set: the previous rows are deleted and the new ones
//! inserted in one transaction.

use ingr_common::db::{self, BoundingBox, KeyPoint, Segmentation};
use ingr_common::{ids, time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

/// Bounding box as sent by the client; `imageId` is ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundingBoxInput {
    pub id: Option<String>,
    #[serde(alias = "class_id")]
    pub class_id: Option<String>,
    #[serde(alias = "x_min")]
    pub x_min: f64,
    #[serde(alias = "y_min")]
    pub y_min: f64,
    #[serde(alias = "x_max")]
    pub x_max: f64,
    #[serde(alias = "y_max")]
    pub y_max: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyPointInput {
    pub id: Option<String>,
    #[serde(alias = "class_id")]
    pub class_id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmentationInput {
    pub id: Option<String>,
    #[serde(alias = "class_id")]
    pub class_id: Option<String>,
    pub mask: String,
    pub confidence: f64,
}

/// Every label attached to one image
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSet {
    pub image_id: String,
    pub bounding_boxes: Vec<BoundingBox>,
    pub key_points: Vec<KeyPoint>,
    pub segmentations: Vec<Segmentation>,
}

impl LabelSet {
    pub fn len(&self) -> usize {
        self.bounding_boxes.len() + self.key_points.len() + self.segmentations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Replace all labels of `image_id` with the supplied rows
///
/// The image must exist. Blank class ids are stored as no class; a class id
/// that does not exist rejects the whole request.
pub async fn replace_labels(
    pool: &SqlitePool,
    image_id: &str,
    boxes: &[BoundingBoxInput],
    keypoints: &[KeyPointInput],
    segmentations: &[SegmentationInput],
) -> Result<LabelSet> {
    let image_id = image_id.trim();
    if image_id.is_empty() {
        return Err(Error::required("image_id"));
    }

    let mut tx = db::begin_write(pool).await?;

    let image_exists = sqlx::query("SELECT 1 FROM images WHERE id = ?")
        .bind(image_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !image_exists {
        return Err(Error::NotFound(format!("Image {}", image_id)));
    }

    for table in ["bounding_boxes", "keypoints", "segmentations"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE image_id = ?"))
            .bind(image_id)
            .execute(&mut *tx)
            .await?;
    }

    let now = time::now_rfc3339();
    let mut set = LabelSet {
        image_id: image_id.to_string(),
        ..Default::default()
    };

    for input in boxes {
        let class_id = resolve_class(&mut tx, input.class_id.as_deref()).await?;
        let row = BoundingBox {
            id: ids::or_generate(input.id.as_deref()),
            image_id: image_id.to_string(),
            class_id,
            x_min: input.x_min,
            y_min: input.y_min,
            x_max: input.x_max,
            y_max: input.y_max,
            confidence: input.confidence,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        sqlx::query(
            r#"
            INSERT INTO bounding_boxes
                (id, image_id, class_id, x_min, y_min, x_max, y_max, confidence, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.image_id)
        .bind(&row.class_id)
        .bind(row.x_min)
        .bind(row.y_min)
        .bind(row.x_max)
        .bind(row.y_max)
        .bind(row.confidence)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(&mut *tx)
        .await?;
        set.bounding_boxes.push(row);
    }

    for input in keypoints {
        let class_id = resolve_class(&mut tx, input.class_id.as_deref()).await?;
        let row = KeyPoint {
            id: ids::or_generate(input.id.as_deref()),
            image_id: image_id.to_string(),
            class_id,
            x: input.x,
            y: input.y,
            confidence: input.confidence,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        sqlx::query(
            r#"
            INSERT INTO keypoints (id, image_id, class_id, x, y, confidence, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.image_id)
        .bind(&row.class_id)
        .bind(row.x)
        .bind(row.y)
        .bind(row.confidence)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(&mut *tx)
        .await?;
        set.key_points.push(row);
    }

    for input in segmentations {
        let class_id = resolve_class(&mut tx, input.class_id.as_deref()).await?;
        let row = Segmentation {
            id: ids::or_generate(input.id.as_deref()),
            image_id: image_id.to_string(),
            class_id,
            mask: input.mask.clone(),
            confidence: input.confidence,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        sqlx::query(
            r#"
            INSERT INTO segmentations (id, image_id, class_id, mask, confidence, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.image_id)
        .bind(&row.class_id)
        .bind(&row.mask)
        .bind(row.confidence)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(&mut *tx)
        .await?;
        set.segmentations.push(row);
    }

    tx.commit().await?;

    info!(
        image_id = %image_id,
        boxes = set.bounding_boxes.len(),
        keypoints = set.key_points.len(),
        segmentations = set.segmentations.len(),
        "Labels replaced"
    );

    Ok(set)
}

/// Labels currently stored for an image
pub async fn list_labels(pool: &SqlitePool, image_id: &str) -> Result<LabelSet> {
    let image_id = image_id.trim();
    if image_id.is_empty() {
        return Err(Error::required("image_id"));
    }

    let bounding_boxes = sqlx::query_as::<_, BoundingBox>(
        "SELECT * FROM bounding_boxes WHERE image_id = ? ORDER BY created_at, id",
    )
    .bind(image_id)
    .fetch_all(pool)
    .await?;

    let key_points = sqlx::query_as::<_, KeyPoint>(
        "SELECT * FROM keypoints WHERE image_id = ? ORDER BY created_at, id",
    )
    .bind(image_id)
    .fetch_all(pool)
    .await?;

    let segmentations = sqlx::query_as::<_, Segmentation>(
        "SELECT * FROM segmentations WHERE image_id = ? ORDER BY created_at, id",
    )
    .bind(image_id)
    .fetch_all(pool)
    .await?;

    Ok(LabelSet {
        image_id: image_id.to_string(),
        bounding_boxes,
        key_points,
        segmentations,
    })
}

async fn resolve_class(conn: &mut SqliteConnection, class_id: Option<&str>) -> Result<Option<String>> {
    let Some(class_id) = class_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };

    let exists = sqlx::query("SELECT 1 FROM classes WHERE id = ?")
        .bind(class_id)
        .fetch_optional(&mut *conn)
        .await?
        .is_some();
    if !exists {
        return Err(Error::Validation(format!("Unknown class {}", class_id)));
    }

    Ok(Some(class_id.to_string()))
}
