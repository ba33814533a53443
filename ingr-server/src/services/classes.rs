//! Annotation classes

use super::{apply, WriteMode};
use crate::relations::{self, Relation};
use ingr_common::db::{self, Class};
use ingr_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

/// Body of `POST /classes/:id` and `PUT /classes/:id`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClassUpsert {
    pub name: Option<String>,
    pub color: Option<String>,
    #[serde(alias = "datasetIds")]
    pub dataset_ids: Option<Vec<String>>,
    #[serde(alias = "imageIds")]
    pub image_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: Class,
    pub dataset_ids: Vec<String>,
    pub image_ids: Vec<String>,
}

async fn fetch_class(conn: &mut SqliteConnection, id: &str) -> Result<Option<Class>> {
    let class = sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(class)
}

async fn detail(conn: &mut SqliteConnection, class: Class) -> Result<ClassDetail> {
    let dataset_ids = relations::linked_ids(conn, Relation::ClassDatasets, &class.id).await?;
    let image_ids = relations::linked_ids(conn, Relation::ClassImages, &class.id).await?;
    Ok(ClassDetail {
        class,
        dataset_ids,
        image_ids,
    })
}

pub async fn list_classes(pool: &SqlitePool) -> Result<Vec<ClassDetail>> {
    let mut conn = pool.acquire().await?;
    let classes = sqlx::query_as::<_, Class>("SELECT * FROM classes ORDER BY created_at, id")
        .fetch_all(&mut *conn)
        .await?;

    let mut details = Vec::with_capacity(classes.len());
    for class in classes {
        details.push(detail(&mut conn, class).await?);
    }
    Ok(details)
}

pub async fn get_class(pool: &SqlitePool, id: &str) -> Result<ClassDetail> {
    let mut conn = pool.acquire().await?;
    let class = fetch_class(&mut conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Class {}", id)))?;
    detail(&mut conn, class).await
}

/// Write the class fields, then reconcile whichever relations were supplied
pub async fn upsert_class(
    pool: &SqlitePool,
    id: &str,
    req: &ClassUpsert,
    mode: WriteMode,
) -> Result<ClassDetail> {
    if id.trim().is_empty() {
        return Err(Error::required("class_id"));
    }

    let mut tx = db::begin_write(pool).await?;

    match fetch_class(&mut tx, id).await? {
        Some(mut class) => {
            apply(&mut class.name, &req.name);
            apply(&mut class.color, &req.color);
            sqlx::query("UPDATE classes SET name = ?, color = ? WHERE id = ?")
                .bind(&class.name)
                .bind(&class.color)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        None if mode == WriteMode::UpdateExisting => {
            return Err(Error::NotFound(format!("Class {}", id)));
        }
        None => {
            sqlx::query("INSERT INTO classes (id, name, color, created_at) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(req.name.clone().unwrap_or_default())
                .bind(req.color.clone().unwrap_or_default())
                .bind(time::now_rfc3339())
                .execute(&mut *tx)
                .await?;
            info!(class_id = %id, "Class created");
        }
    }

    relations::reconcile_optional(&mut tx, Relation::ClassDatasets, id, req.dataset_ids.as_deref())
        .await?;
    relations::reconcile_optional(&mut tx, Relation::ClassImages, id, req.image_ids.as_deref())
        .await?;

    let class = fetch_class(&mut tx, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Class {} vanished during upsert", id)))?;
    let detail = detail(&mut tx, class).await?;

    tx.commit().await?;
    Ok(detail)
}

/// Delete a class; labels that referenced it keep their rows without a class
pub async fn delete_class(pool: &SqlitePool, id: &str) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM classes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::NotFound(format!("Class {}", id)));
    }

    info!(class_id = %id, "Class deleted");
    Ok(())
}
