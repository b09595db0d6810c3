//! r2d2 connection pool over rusqlite.
//!
//! The pool is the only way the rest of the crate reaches SQLite: the
//! sqlite-vec auto-extension is registered once before the first connection
//! is opened, and every pooled connection gets uniform pragmas through the
//! manager's init hook.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;

use crate::db::schema;
use crate::error::Result;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Open (or create) the database at `db_path` and build a pool of
/// `pool_size` connections with the full schema applied.
///
/// # Errors
///
/// Fails if the database cannot be opened or the schema DDL fails.
pub fn build_pool(db_path: impl AsRef<Path>, pool_size: u32) -> Result<DbPool> {
    // Register the sqlite-vec auto-extension before any connection opens.
    schema::load_sqlite_vec_extension();

    let manager = SqliteConnectionManager::file(db_path.as_ref())
        .with_init(|conn| schema::configure_connection(conn));

    let pool = r2d2::Pool::builder()
        .max_size(pool_size.max(1))
        .build(manager)?;

    // Apply the schema once; IF NOT EXISTS makes this idempotent.
    let conn = pool.get()?;
    schema::initialize_database(&conn)?;

    Ok(pool)
}
