//! Projects group datasets

use super::{apply, WriteMode};
use crate::relations::{self, Relation};
use ingr_common::db::{self, Project};
use ingr_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectUpsert {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "dataset_ids")]
    pub dataset_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub dataset_ids: Vec<String>,
}

async fn fetch_project(conn: &mut SqliteConnection, id: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(project)
}

pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<ProjectDetail>> {
    let mut conn = pool.acquire().await?;
    let projects = sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at, id")
        .fetch_all(&mut *conn)
        .await?;

    let mut details = Vec::with_capacity(projects.len());
    for project in projects {
        let dataset_ids =
            relations::linked_ids(&mut conn, Relation::ProjectDatasets, &project.id).await?;
        details.push(ProjectDetail {
            project,
            dataset_ids,
        });
    }
    Ok(details)
}

pub async fn upsert_project(
    pool: &SqlitePool,
    id: &str,
    req: &ProjectUpsert,
    mode: WriteMode,
) -> Result<ProjectDetail> {
    if id.trim().is_empty() {
        return Err(Error::required("project_id"));
    }

    let mut tx = db::begin_write(pool).await?;

    match fetch_project(&mut tx, id).await? {
        Some(mut project) => {
            apply(&mut project.name, &req.name);
            apply(&mut project.description, &req.description);
            sqlx::query("UPDATE projects SET name = ?, description = ? WHERE id = ?")
                .bind(&project.name)
                .bind(&project.description)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        None if mode == WriteMode::UpdateExisting => {
            return Err(Error::NotFound(format!("Project {}", id)));
        }
        None => {
            sqlx::query(
                "INSERT INTO projects (id, name, description, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(req.name.clone().unwrap_or_default())
            .bind(req.description.clone().unwrap_or_default())
            .bind(time::now_rfc3339())
            .execute(&mut *tx)
            .await?;
        }
    }

    relations::reconcile_optional(
        &mut tx,
        Relation::ProjectDatasets,
        id,
        req.dataset_ids.as_deref(),
    )
    .await?;

    let project = fetch_project(&mut tx, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Project {} vanished during upsert", id)))?;
    let dataset_ids = relations::linked_ids(&mut tx, Relation::ProjectDatasets, id).await?;

    tx.commit().await?;
    Ok(ProjectDetail {
        project,
        dataset_ids,
    })
}

/// Delete a project; its datasets are untouched
pub async fn delete_project(pool: &SqlitePool, id: &str) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::NotFound(format!("Project {}", id)));
    }
    Ok(())
}
