//! Many-to-many relationship reconciliation
//!
//! A relation is seen from its owner: `ClassDatasets` and `DatasetClasses`
//! share the `dataset_classes` table but differ in which column is fixed.
//! Reconciling replaces the owner's link set with a desired set. Targets
//! that do not exist are dropped, not reported.

use ingr_common::{db, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use tracing::debug;

/// An owner-side view of a link table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    DatasetImages,
    DatasetClasses,
    ClassDatasets,
    ClassImages,
    ImageDatasets,
    ImageClasses,
    ProjectDatasets,
}

impl Relation {
    /// (link table, owner column, target column, target table)
    fn schema(self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            Relation::DatasetImages => ("dataset_images", "dataset_id", "image_id", "images"),
            Relation::DatasetClasses => ("dataset_classes", "dataset_id", "class_id", "classes"),
            Relation::ClassDatasets => ("dataset_classes", "class_id", "dataset_id", "datasets"),
            Relation::ClassImages => ("class_images", "class_id", "image_id", "images"),
            Relation::ImageDatasets => ("dataset_images", "image_id", "dataset_id", "datasets"),
            Relation::ImageClasses => ("class_images", "image_id", "class_id", "classes"),
            Relation::ProjectDatasets => {
                ("project_datasets", "project_id", "dataset_id", "datasets")
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Relation::DatasetImages => "dataset.images",
            Relation::DatasetClasses => "dataset.classes",
            Relation::ClassDatasets => "class.datasets",
            Relation::ClassImages => "class.images",
            Relation::ImageDatasets => "image.datasets",
            Relation::ImageClasses => "image.classes",
            Relation::ProjectDatasets => "project.datasets",
        }
    }
}

/// Links to create and links to drop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Difference between the current and the desired link set
///
/// Applying the delta to `current` yields exactly `desired`.
pub fn plan(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> Delta {
    Delta {
        to_add: desired.difference(current).cloned().collect(),
        to_remove: current.difference(desired).cloned().collect(),
    }
}

/// Target ids currently linked to `owner_id`, sorted
pub async fn linked_ids(
    conn: &mut SqliteConnection,
    relation: Relation,
    owner_id: &str,
) -> Result<Vec<String>> {
    let (table, owner_col, target_col, _) = relation.schema();
    let sql = format!(
        "SELECT {target_col} FROM {table} WHERE {owner_col} = ? ORDER BY {target_col}"
    );
    let rows = sqlx::query(&sql).bind(owner_id).fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(|row| row.get::<String, _>(0)).collect())
}

/// Pool convenience for [`linked_ids`]
pub async fn linked_ids_in_pool(
    pool: &SqlitePool,
    relation: Relation,
    owner_id: &str,
) -> Result<Vec<String>> {
    let mut conn = pool.acquire().await?;
    linked_ids(&mut conn, relation, owner_id).await
}

/// Replace the owner's link set with `desired` in one transaction
pub async fn reconcile(
    pool: &SqlitePool,
    relation: Relation,
    owner_id: &str,
    desired: &[String],
) -> Result<Delta> {
    let mut tx = db::begin_write(pool).await?;
    let delta = reconcile_in(&mut tx, relation, owner_id, desired).await?;
    tx.commit().await?;
    Ok(delta)
}

/// Reconcile on an open connection or transaction
///
/// Unknown target ids are filtered out before planning, so they never
/// reach the link table.
pub async fn reconcile_in(
    conn: &mut SqliteConnection,
    relation: Relation,
    owner_id: &str,
    desired: &[String],
) -> Result<Delta> {
    let (table, owner_col, target_col, target_table) = relation.schema();

    let mut resolved = BTreeSet::new();
    let exists_sql = format!("SELECT 1 FROM {target_table} WHERE id = ?");
    for id in desired {
        if resolved.contains(id) {
            continue;
        }
        let found = sqlx::query(&exists_sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .is_some();
        if found {
            resolved.insert(id.clone());
        } else {
            debug!(
                relation = relation.name(),
                owner_id = %owner_id,
                target_id = %id,
                "Dropping unknown relation target"
            );
        }
    }

    let current: BTreeSet<String> = linked_ids(conn, relation, owner_id)
        .await?
        .into_iter()
        .collect();
    let delta = plan(&current, &resolved);

    let delete_sql = format!("DELETE FROM {table} WHERE {owner_col} = ? AND {target_col} = ?");
    for id in &delta.to_remove {
        sqlx::query(&delete_sql)
            .bind(owner_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    let insert_sql =
        format!("INSERT OR IGNORE INTO {table} ({owner_col}, {target_col}) VALUES (?, ?)");
    for id in &delta.to_add {
        sqlx::query(&insert_sql)
            .bind(owner_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    if !delta.is_empty() {
        debug!(
            relation = relation.name(),
            owner_id = %owner_id,
            added = delta.to_add.len(),
            removed = delta.to_remove.len(),
            "Relation reconciled"
        );
    }

    Ok(delta)
}

/// Apply the reconciliation only when the caller supplied a desired set
///
/// `None` leaves the relation untouched; `Some(empty)` clears it.
pub async fn reconcile_optional(
    conn: &mut SqliteConnection,
    relation: Relation,
    owner_id: &str,
    desired: Option<&[String]>,
) -> Result<Option<Delta>> {
    match desired {
        Some(ids) => Ok(Some(reconcile_in(conn, relation, owner_id, ids).await?)),
        None => Ok(None),
    }
}
