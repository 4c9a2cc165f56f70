//! Database initialization and seed data

pub mod init;
pub mod seed;

pub use init::{create_schema, init_database};
pub use seed::{seed_reference_data, SeedReport};

use sqlx::{Sqlite, SqlitePool, Transaction};

/// Open a transaction that holds the write lock from its first statement
///
/// A deferred transaction that reads before it writes cannot upgrade its
/// lock once another writer has committed; SQLite fails it with
/// SQLITE_BUSY without consulting the busy timeout. `BEGIN IMMEDIATE` waits
/// on the busy timeout instead.
pub async fn begin_write(pool: &SqlitePool) -> crate::Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
