//! SQLite schema initialization for Nimdex.

use rusqlite::Connection;
use tracing::warn;

/// Dimension of the embedding vectors served by the provider.
pub const EMBEDDING_DIM: usize = 768;

// ---------------------------------------------------------------------------
// DDL constants — kept as separate strings so each statement can be executed
// individually and error reporting stays clear.
// ---------------------------------------------------------------------------

const CREATE_SYMBOLS: &str = "\
CREATE TABLE IF NOT EXISTS symbols (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  kind TEXT NOT NULL,
  module TEXT NOT NULL,
  file_path TEXT NOT NULL,
  line INTEGER NOT NULL,
  col INTEGER NOT NULL,
  signature TEXT NOT NULL DEFAULT '',
  documentation TEXT NOT NULL DEFAULT '',
  visibility TEXT NOT NULL DEFAULT 'private',
  name_embedding TEXT,
  signature_embedding TEXT,
  doc_embedding TEXT,
  combined_embedding TEXT,
  embedding_model TEXT,
  embedding_version TEXT,
  indexed_at INTEGER DEFAULT (strftime('%s','now'))
)";

const CREATE_MODULES: &str = "\
CREATE TABLE IF NOT EXISTS modules (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  file_path TEXT NOT NULL,
  last_modified TEXT,
  documentation TEXT NOT NULL DEFAULT ''
)";

// Indexes ----------------------------------------------------------------

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name)",
    "CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind)",
    "CREATE INDEX IF NOT EXISTS idx_symbols_module ON symbols(module)",
    "CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path)",
    "CREATE INDEX IF NOT EXISTS idx_modules_name ON modules(name)",
];

// sqlite-vec -------------------------------------------------------------

const CREATE_VEC_SYMBOLS: &str = "\
CREATE VIRTUAL TABLE IF NOT EXISTS vec_symbols USING vec0(
  symbol_id INTEGER PRIMARY KEY,
  embedding float[768] distance_metric=cosine
)";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load the `sqlite-vec` extension via `sqlite3_auto_extension`.
///
/// This **must** be called before any connection is opened so that every
/// new connection automatically has vec0 available.  The call is idempotent
/// — calling it more than once is harmless.
#[allow(clippy::missing_transmute_annotations)]
pub fn load_sqlite_vec_extension() {
    use rusqlite::ffi::sqlite3_auto_extension;
    use sqlite_vec::sqlite3_vec_init;

    unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    }
}

/// Create the `vec_symbols` virtual table.
///
/// Separated into its own function because it depends on the `sqlite-vec`
/// extension being loaded.  If the extension is unavailable the error is
/// logged as a warning and execution continues — the rest of the schema is
/// fully functional without vector KNN (semantic search falls back to a
/// full scan over the scalar columns).
pub fn create_vec_table(conn: &Connection) {
    if let Err(e) = conn.execute_batch(CREATE_VEC_SYMBOLS) {
        warn!("could not create vec_symbols table (sqlite-vec may not be loaded): {e}");
    }
}

/// Configure pragmas on a freshly opened connection.
///
/// Applied by the pool's init hook so every pooled connection is uniform.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

/// Apply the full Nimdex schema on an open connection.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if any DDL statement fails (excluding the
/// optional `vec_symbols` table).
pub fn initialize_database(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_SYMBOLS)?;
    conn.execute_batch(CREATE_MODULES)?;

    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }

    create_vec_table(conn);

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
