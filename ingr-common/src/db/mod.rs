//! Database models and schema

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;

use crate::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Start a transaction that takes the write lock up front
///
/// A deferred transaction that reads and then writes fails with
/// `SQLITE_BUSY` when another writer commits in between; `BEGIN IMMEDIATE`
/// waits on `busy_timeout` instead.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
