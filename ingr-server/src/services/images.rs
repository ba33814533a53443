//! Image records and the image deletion policy

use super::{apply, WriteMode};
use crate::assets::delete_asset_files;
use crate::relations::{self, Relation};
use ingr_common::db::{self, default_image_properties, Image};
use ingr_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

/// Fields accepted by `POST /images/:id`
///
/// Absent fields keep their stored value. For `datasetIds`/`classIds`,
/// absent means "leave the relation alone" and an empty list clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageUpsert {
    pub filename: Option<String>,
    #[serde(alias = "file_location")]
    pub file_location: Option<String>,
    #[serde(alias = "thumbnail_location")]
    pub thumbnail_location: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub size: Option<i64>,
    pub approval: Option<String>,
    pub comment: Option<String>,
    #[serde(alias = "labeled_by")]
    pub labeled_by: Option<String>,
    #[serde(alias = "edited_by")]
    pub edited_by: Option<String>,
    #[serde(alias = "uploaded_by")]
    pub uploaded_by: Option<String>,
    pub properties: Option<Value>,
    #[serde(alias = "dataset_ids")]
    pub dataset_ids: Option<Vec<String>>,
    #[serde(alias = "class_ids")]
    pub class_ids: Option<Vec<String>>,
}

/// Image record with its relation ids
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetail {
    #[serde(flatten)]
    pub image: Image,
    pub dataset_ids: Vec<String>,
    pub class_ids: Vec<String>,
}

/// Outcome of [`delete_image`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDeletion {
    pub image_id: String,
    /// Record and files were removed
    pub deleted: bool,
    /// Datasets the image was unlinked from
    pub unlinked_dataset_ids: Vec<String>,
    pub message: String,
}

pub(crate) async fn fetch_image(conn: &mut SqliteConnection, id: &str) -> Result<Option<Image>> {
    let image = sqlx::query_as::<_, Image>("SELECT * FROM images WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(image)
}

async fn detail(conn: &mut SqliteConnection, image: Image) -> Result<ImageDetail> {
    let dataset_ids = relations::linked_ids(conn, Relation::ImageDatasets, &image.id).await?;
    let class_ids = relations::linked_ids(conn, Relation::ImageClasses, &image.id).await?;
    Ok(ImageDetail {
        image,
        dataset_ids,
        class_ids,
    })
}

/// Images linked to any of `dataset_ids`, or every image when none are given
pub async fn list_images(pool: &SqlitePool, dataset_ids: &[String]) -> Result<Vec<ImageDetail>> {
    let mut conn = pool.acquire().await?;

    let images = if dataset_ids.is_empty() {
        sqlx::query_as::<_, Image>("SELECT * FROM images ORDER BY uploaded_at, id")
            .fetch_all(&mut *conn)
            .await?
    } else {
        let placeholders = vec!["?"; dataset_ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM images WHERE id IN \
             (SELECT image_id FROM dataset_images WHERE dataset_id IN ({placeholders})) \
             ORDER BY uploaded_at, id"
        );
        let mut query = sqlx::query_as::<_, Image>(&sql);
        for id in dataset_ids {
            query = query.bind(id);
        }
        query.fetch_all(&mut *conn).await?
    };

    let mut details = Vec::with_capacity(images.len());
    for image in images {
        details.push(detail(&mut conn, image).await?);
    }
    Ok(details)
}

pub async fn get_image(pool: &SqlitePool, id: &str) -> Result<ImageDetail> {
    let mut conn = pool.acquire().await?;
    let image = fetch_image(&mut conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Image {}", id)))?;
    detail(&mut conn, image).await
}

/// Create or update an image, then reconcile the supplied relations
pub async fn upsert_image(
    pool: &SqlitePool,
    id: &str,
    req: &ImageUpsert,
    mode: WriteMode,
) -> Result<ImageDetail> {
    if id.trim().is_empty() {
        return Err(Error::required("image_id"));
    }

    let mut tx = db::begin_write(pool).await?;
    let now = time::now_rfc3339();

    match fetch_image(&mut tx, id).await? {
        Some(mut image) => {
            apply(&mut image.filename, &req.filename);
            apply(&mut image.file_location, &req.file_location);
            apply(&mut image.thumbnail_location, &req.thumbnail_location);
            apply(&mut image.width, &req.width);
            apply(&mut image.height, &req.height);
            apply(&mut image.media_type, &req.media_type);
            apply(&mut image.size, &req.size);
            apply(&mut image.approval, &req.approval);
            apply(&mut image.comment, &req.comment);
            apply(&mut image.labeled_by, &req.labeled_by);
            apply(&mut image.edited_by, &req.edited_by);
            apply(&mut image.uploaded_by, &req.uploaded_by);
            if let Some(properties) = &req.properties {
                image.properties = Json(properties.clone());
            }
            image.updated_at = now;
            write_image(&mut tx, &image, false).await?;
        }
        None if mode == WriteMode::UpdateExisting => {
            return Err(Error::NotFound(format!("Image {}", id)));
        }
        None => {
            let image = Image {
                id: id.to_string(),
                filename: req.filename.clone().unwrap_or_default(),
                file_location: req.file_location.clone().unwrap_or_default(),
                thumbnail_location: req.thumbnail_location.clone().unwrap_or_default(),
                width: req.width.unwrap_or_default(),
                height: req.height.unwrap_or_default(),
                media_type: req.media_type.clone().unwrap_or_default(),
                size: req.size.unwrap_or_default(),
                approval: req.approval.clone().unwrap_or_default(),
                comment: req.comment.clone().unwrap_or_default(),
                labeled_by: req.labeled_by.clone().unwrap_or_default(),
                edited_by: req.edited_by.clone().unwrap_or_default(),
                uploaded_by: req.uploaded_by.clone().unwrap_or_default(),
                properties: Json(
                    req.properties
                        .clone()
                        .unwrap_or_else(default_image_properties),
                ),
                uploaded_at: now.clone(),
                updated_at: now,
            };
            write_image(&mut tx, &image, true).await?;
            info!(image_id = %id, "Image created");
        }
    }

    relations::reconcile_optional(
        &mut tx,
        Relation::ImageDatasets,
        id,
        req.dataset_ids.as_deref(),
    )
    .await?;
    relations::reconcile_optional(&mut tx, Relation::ImageClasses, id, req.class_ids.as_deref())
        .await?;

    let image = fetch_image(&mut tx, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Image {} vanished during upsert", id)))?;
    let detail = detail(&mut tx, image).await?;

    tx.commit().await?;
    Ok(detail)
}

async fn write_image(conn: &mut SqliteConnection, image: &Image, insert: bool) -> Result<()> {
    let sql = if insert {
        r#"
        INSERT INTO images
            (filename, file_location, thumbnail_location, width, height, media_type, size,
             approval, comment, labeled_by, edited_by, uploaded_by, properties,
             uploaded_at, updated_at, id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#
    } else {
        r#"
        UPDATE images SET
            filename = ?, file_location = ?, thumbnail_location = ?, width = ?, height = ?,
            media_type = ?, size = ?, approval = ?, comment = ?, labeled_by = ?,
            edited_by = ?, uploaded_by = ?, properties = ?, uploaded_at = ?, updated_at = ?
        WHERE id = ?
        "#
    };

    sqlx::query(sql)
        .bind(&image.filename)
        .bind(&image.file_location)
        .bind(&image.thumbnail_location)
        .bind(image.width)
        .bind(image.height)
        .bind(&image.media_type)
        .bind(image.size)
        .bind(&image.approval)
        .bind(&image.comment)
        .bind(&image.labeled_by)
        .bind(&image.edited_by)
        .bind(&image.uploaded_by)
        .bind(&image.properties)
        .bind(&image.uploaded_at)
        .bind(&image.updated_at)
        .bind(&image.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Remove an image, or only its links to the scoped datasets
///
/// With no scope the image is deleted outright. With a scope, the links to
/// those datasets are removed and the image is deleted only when no dataset
/// still references it. Files are removed after the transaction commits;
/// failures there are logged.
pub async fn delete_image(
    pool: &SqlitePool,
    id: &str,
    scope_dataset_ids: &[String],
) -> Result<ImageDeletion> {
    let mut tx = db::begin_write(pool).await?;

    let image = fetch_image(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Image {}", id)))?;

    let mut unlinked = Vec::new();
    let delete_record = if scope_dataset_ids.is_empty() {
        true
    } else {
        for dataset_id in scope_dataset_ids {
            let removed = sqlx::query(
                "DELETE FROM dataset_images WHERE image_id = ? AND dataset_id = ?",
            )
            .bind(id)
            .bind(dataset_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if removed > 0 {
                unlinked.push(dataset_id.clone());
            }
        }
        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM dataset_images WHERE image_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        remaining == 0
    };

    if delete_record {
        delete_image_row(&mut tx, id).await?;
    }

    tx.commit().await?;

    let message = if delete_record {
        delete_asset_files(&image.file_location, &image.thumbnail_location).await;
        info!(image_id = %id, "Image deleted");
        format!("Image {} deleted", id)
    } else {
        info!(image_id = %id, datasets = ?unlinked, "Image unlinked");
        format!("Image {} unlinked from datasets {:?}", id, unlinked)
    };

    Ok(ImageDeletion {
        image_id: id.to_string(),
        deleted: delete_record,
        unlinked_dataset_ids: unlinked,
        message,
    })
}

/// Delete the image row; link, label and feature rows cascade
pub(crate) async fn delete_image_row(conn: &mut SqliteConnection, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM images WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_distinguishes_absent_from_empty() {
        let absent: ImageUpsert = serde_json::from_str(r#"{"filename":"a.png"}"#).unwrap();
        assert!(absent.dataset_ids.is_none());

        let null: ImageUpsert = serde_json::from_str(r#"{"datasetIds":null}"#).unwrap();
        assert!(null.dataset_ids.is_none());

        let empty: ImageUpsert = serde_json::from_str(r#"{"datasetIds":[]}"#).unwrap();
        assert_eq!(empty.dataset_ids, Some(Vec::new()));
    }

    #[test]
    fn test_upsert_reads_type_field() {
        let req: ImageUpsert =
            serde_json::from_str(r#"{"type":"image/png","class_ids":["c1"]}"#).unwrap();
        assert_eq!(req.media_type.as_deref(), Some("image/png"));
        assert_eq!(req.class_ids, Some(vec!["c1".to_string()]));
    }
}
