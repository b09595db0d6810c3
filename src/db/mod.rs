//! SQLite layer: schema, connection pool, row conversion.

pub mod converters;
pub mod pool;
pub mod schema;

pub use pool::{build_pool, DbPool, PooledConn};
pub use schema::{initialize_database, load_sqlite_vec_extension, EMBEDDING_DIM};
