//! Entity services
//!
//! Each service owns the SQL for one entity: row CRUD plus relation
//! reconciliation, run inside a single transaction per call.

pub mod classes;
pub mod datasets;
pub mod images;
pub mod projects;

/// How a write treats a missing row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the row when absent
    Upsert,
    /// Fail with `NotFound` when absent
    UpdateExisting,
}

/// Overwrite `field` when the caller supplied a value
pub(crate) fn apply<T: Clone>(field: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *field = value.clone();
    }
}
