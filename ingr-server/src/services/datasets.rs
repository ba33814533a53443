//! Datasets and the cascading dataset delete

use super::{apply, images, WriteMode};
use crate::assets::delete_asset_files;
use crate::relations::{self, Relation};
use ingr_common::db::{self, Dataset, Image};
use ingr_common::{ids, time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetUpsert {
    /// Only read by `POST /datasets/`; a blank id is generated
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "class_ids")]
    pub class_ids: Option<Vec<String>>,
    #[serde(alias = "image_ids")]
    pub image_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDetail {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub class_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ids: Option<Vec<String>>,
}

/// What a dataset delete did to the rows it touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDeletion {
    pub dataset_id: String,
    pub deleted_images: usize,
    pub unlinked_images: usize,
    pub deleted_classes: usize,
    pub unlinked_classes: usize,
}

async fn fetch_dataset(conn: &mut SqliteConnection, id: &str) -> Result<Option<Dataset>> {
    let dataset = sqlx::query_as::<_, Dataset>("SELECT * FROM datasets WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(dataset)
}

/// Every dataset with its class ids
pub async fn list_datasets(pool: &SqlitePool) -> Result<Vec<DatasetDetail>> {
    let mut conn = pool.acquire().await?;
    let datasets = sqlx::query_as::<_, Dataset>("SELECT * FROM datasets ORDER BY uploaded_at, id")
        .fetch_all(&mut *conn)
        .await?;

    let mut details = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let class_ids = relations::linked_ids(&mut conn, Relation::DatasetClasses, &dataset.id).await?;
        details.push(DatasetDetail {
            dataset,
            class_ids,
            image_ids: None,
        });
    }
    Ok(details)
}

pub async fn get_dataset(pool: &SqlitePool, id: &str) -> Result<DatasetDetail> {
    let mut conn = pool.acquire().await?;
    let dataset = fetch_dataset(&mut conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Dataset {}", id)))?;
    full_detail(&mut conn, dataset).await
}

async fn full_detail(conn: &mut SqliteConnection, dataset: Dataset) -> Result<DatasetDetail> {
    let class_ids = relations::linked_ids(conn, Relation::DatasetClasses, &dataset.id).await?;
    let image_ids = relations::linked_ids(conn, Relation::DatasetImages, &dataset.id).await?;
    Ok(DatasetDetail {
        dataset,
        class_ids,
        image_ids: Some(image_ids),
    })
}

/// `POST /datasets/`: create with the body's id, or a generated one
pub async fn create_dataset(pool: &SqlitePool, req: &DatasetUpsert) -> Result<DatasetDetail> {
    let id = ids::or_generate(req.id.as_deref());
    upsert_dataset(pool, &id, req, WriteMode::Upsert).await
}

pub async fn upsert_dataset(
    pool: &SqlitePool,
    id: &str,
    req: &DatasetUpsert,
    mode: WriteMode,
) -> Result<DatasetDetail> {
    if id.trim().is_empty() {
        return Err(Error::required("dataset_id"));
    }

    let mut tx = db::begin_write(pool).await?;
    let now = time::now_rfc3339();

    match fetch_dataset(&mut tx, id).await? {
        Some(mut dataset) => {
            apply(&mut dataset.name, &req.name);
            apply(&mut dataset.description, &req.description);
            sqlx::query("UPDATE datasets SET name = ?, description = ?, updated_at = ? WHERE id = ?")
                .bind(&dataset.name)
                .bind(&dataset.description)
                .bind(&now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        None if mode == WriteMode::UpdateExisting => {
            return Err(Error::NotFound(format!("Dataset {}", id)));
        }
        None => {
            sqlx::query(
                "INSERT INTO datasets (id, name, description, uploaded_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(req.name.clone().unwrap_or_default())
            .bind(req.description.clone().unwrap_or_default())
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            info!(dataset_id = %id, "Dataset created");
        }
    }

    relations::reconcile_optional(&mut tx, Relation::DatasetClasses, id, req.class_ids.as_deref())
        .await?;
    relations::reconcile_optional(&mut tx, Relation::DatasetImages, id, req.image_ids.as_deref())
        .await?;

    let dataset = fetch_dataset(&mut tx, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Dataset {} vanished during upsert", id)))?;
    let detail = full_detail(&mut tx, dataset).await?;

    tx.commit().await?;
    Ok(detail)
}

/// Delete a dataset and everything only it owned
///
/// Images and classes linked to this dataset alone are deleted; ones
/// shared with another dataset are only unlinked. Image files are removed
/// after the transaction commits.
pub async fn delete_dataset(pool: &SqlitePool, id: &str) -> Result<DatasetDeletion> {
    let mut tx = db::begin_write(pool).await?;

    if fetch_dataset(&mut tx, id).await?.is_none() {
        return Err(Error::NotFound(format!("Dataset {}", id)));
    }

    let mut outcome = DatasetDeletion {
        dataset_id: id.to_string(),
        ..Default::default()
    };

    let exclusive_images = sqlx::query_as::<_, Image>(
        r#"
        SELECT i.* FROM images i
        JOIN dataset_images di ON di.image_id = i.id
        WHERE di.dataset_id = ?
          AND (SELECT COUNT(*) FROM dataset_images o WHERE o.image_id = i.id) = 1
        "#,
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    for image in &exclusive_images {
        images::delete_image_row(&mut tx, &image.id).await?;
    }
    outcome.deleted_images = exclusive_images.len();

    outcome.unlinked_images = sqlx::query("DELETE FROM dataset_images WHERE dataset_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as usize;

    outcome.deleted_classes = sqlx::query(
        r#"
        DELETE FROM classes WHERE id IN (
            SELECT dc.class_id FROM dataset_classes dc
            WHERE dc.dataset_id = ?
              AND (SELECT COUNT(*) FROM dataset_classes o WHERE o.class_id = dc.class_id) = 1
        )
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected() as usize;

    outcome.unlinked_classes = sqlx::query("DELETE FROM dataset_classes WHERE dataset_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as usize;

    sqlx::query("DELETE FROM datasets WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    for image in &exclusive_images {
        delete_asset_files(&image.file_location, &image.thumbnail_location).await;
    }

    info!(
        dataset_id = %id,
        deleted_images = outcome.deleted_images,
        unlinked_images = outcome.unlinked_images,
        deleted_classes = outcome.deleted_classes,
        unlinked_classes = outcome.unlinked_classes,
        "Dataset deleted"
    );

    Ok(outcome)
}
