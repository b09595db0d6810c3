//! Symbol store: SQLite persistence behind a connection pool.
//!
//! All reads and writes go through prepared statements against pooled
//! connections. Inserts are append-only; nothing in the store deletes rows
//! automatically.

pub mod search;

use std::path::Path;

use rusqlite::params;

use crate::db::converters::{row_to_module, row_to_symbol};
use crate::db::{build_pool, DbPool, PooledConn};
use crate::embedding::serialize::{embedding_to_json, vec_to_blob};
use crate::error::Result;
use crate::types::{EmbeddingStats, Module, NewModule, NewSymbol, Symbol};

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const INSERT_SYMBOL: &str = "\
INSERT INTO symbols (
  name, kind, module, file_path, line, col,
  signature, documentation, visibility,
  name_embedding, signature_embedding, doc_embedding, combined_embedding,
  embedding_model, embedding_version
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const SELECT_SYMBOL_BY_ID: &str = "SELECT * FROM symbols WHERE id = ?1";

const UPDATE_EMBEDDINGS: &str = "\
UPDATE symbols SET
  name_embedding = COALESCE(?2, name_embedding),
  signature_embedding = COALESCE(?3, signature_embedding),
  doc_embedding = COALESCE(?4, doc_embedding),
  combined_embedding = COALESCE(?5, combined_embedding),
  embedding_model = ?6,
  embedding_version = ?7
WHERE id = ?1";

const INSERT_MODULE: &str = "\
INSERT INTO modules (name, file_path, last_modified, documentation)
VALUES (?1, ?2, ?3, ?4)";

const SELECT_MODULE_BY_NAME: &str = "SELECT * FROM modules WHERE name = ?1 LIMIT 1";

const SELECT_ALL_MODULES: &str = "SELECT * FROM modules ORDER BY name, id";

const UPSERT_VEC_SYMBOL: &str = "\
INSERT OR REPLACE INTO vec_symbols (symbol_id, embedding) VALUES (?1, ?2)";

// ---------------------------------------------------------------------------
// SymbolStore
// ---------------------------------------------------------------------------

pub struct SymbolStore {
    pool: DbPool,
}

impl SymbolStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>, pool_size: u32) -> Result<Self> {
        Ok(Self {
            pool: build_pool(db_path, pool_size)?,
        })
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn conn(&self) -> Result<PooledConn> {
        Ok(self.pool.get()?)
    }

    // -- Symbols ------------------------------------------------------------

    /// Append one symbol row and return its assigned id.
    ///
    /// Always inserts: the same arguments twice produce two distinct rows.
    pub fn insert_symbol(&self, symbol: &NewSymbol) -> Result<i64> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(INSERT_SYMBOL)?;
        stmt.execute(params![
            symbol.name,
            symbol.kind.as_str(),
            symbol.module,
            symbol.file_path,
            symbol.line,
            symbol.col,
            symbol.signature,
            symbol.documentation,
            symbol.visibility.as_str(),
            non_empty(symbol.name_embedding.as_deref()).map(embedding_to_json),
            non_empty(symbol.signature_embedding.as_deref()).map(embedding_to_json),
            non_empty(symbol.doc_embedding.as_deref()).map(embedding_to_json),
            non_empty(symbol.combined_embedding.as_deref()).map(embedding_to_json),
            symbol.embedding_model,
            symbol.embedding_version,
        ])?;
        let id = conn.last_insert_rowid();

        if let Some(combined) = non_empty(symbol.combined_embedding.as_deref()) {
            self.mirror_vec(&conn, id, combined);
        }

        Ok(id)
    }

    /// Fetch one symbol; absent ids (including out-of-range) yield `None`.
    pub fn get_symbol_by_id(&self, id: i64) -> Result<Option<Symbol>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_SYMBOL_BY_ID)?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_symbol(row)?)),
            None => Ok(None),
        }
    }

    /// Update a symbol's embedding fields. `None` and empty-slice arguments
    /// leave the corresponding column unchanged; the model and version tags
    /// are always rewritten. Returns false when no row matched `id`.
    #[allow(clippy::too_many_arguments)]
    pub fn update_symbol_embeddings(
        &self,
        id: i64,
        name_embedding: Option<&[f32]>,
        signature_embedding: Option<&[f32]>,
        doc_embedding: Option<&[f32]>,
        combined_embedding: Option<&[f32]>,
        model: &str,
        version: &str,
    ) -> Result<bool> {
        let name_embedding = non_empty(name_embedding);
        let signature_embedding = non_empty(signature_embedding);
        let doc_embedding = non_empty(doc_embedding);
        let combined_embedding = non_empty(combined_embedding);

        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(UPDATE_EMBEDDINGS)?;
        let changed = stmt.execute(params![
            id,
            name_embedding.map(embedding_to_json),
            signature_embedding.map(embedding_to_json),
            doc_embedding.map(embedding_to_json),
            combined_embedding.map(embedding_to_json),
            model,
            version,
        ])?;

        if changed > 0 {
            if let Some(combined) = combined_embedding {
                self.mirror_vec(&conn, id, combined);
            }
        }

        Ok(changed > 0)
    }

    /// Mirror the combined vector into the vec0 table. Best-effort: when the
    /// extension is missing or the dimension does not match the table, the
    /// scalar columns remain authoritative and semantic search falls back to
    /// a full scan.
    fn mirror_vec(&self, conn: &PooledConn, id: i64, embedding: &[f32]) {
        let blob = vec_to_blob(embedding);
        let _ = conn.execute(UPSERT_VEC_SYMBOL, params![id, blob]);
    }

    // -- Modules ------------------------------------------------------------

    pub fn insert_module(&self, module: &NewModule) -> Result<i64> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(INSERT_MODULE)?;
        stmt.execute(params![
            module.name,
            module.file_path,
            module.last_modified,
            module.documentation,
        ])?;
        Ok(conn.last_insert_rowid())
    }

    /// One module row with the given name, if any. Names are not unique;
    /// which row comes back for a duplicated name is unspecified.
    pub fn find_module(&self, name: &str) -> Result<Option<Module>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_MODULE_BY_NAME)?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_module(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_modules(&self) -> Result<Vec<Module>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_ALL_MODULES)?;
        let rows = stmt.query_map([], |row| row_to_module(row))?;
        let mut modules = Vec::new();
        for module in rows {
            modules.push(module?);
        }
        Ok(modules)
    }

    // -- Stats --------------------------------------------------------------

    pub fn get_embedding_stats(&self) -> Result<EmbeddingStats> {
        let conn = self.conn()?;

        let symbols: i64 = conn.query_row("SELECT COUNT(*) FROM symbols", [], |r| r.get(0))?;
        let with_any_embedding: i64 = conn.query_row(
            "SELECT COUNT(*) FROM symbols
             WHERE name_embedding IS NOT NULL
                OR signature_embedding IS NOT NULL
                OR doc_embedding IS NOT NULL
                OR combined_embedding IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        let with_combined_embedding: i64 = conn.query_row(
            "SELECT COUNT(*) FROM symbols WHERE combined_embedding IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        let modules: i64 = conn.query_row("SELECT COUNT(*) FROM modules", [], |r| r.get(0))?;

        Ok(EmbeddingStats {
            symbols: symbols as usize,
            with_any_embedding: with_any_embedding as usize,
            with_combined_embedding: with_combined_embedding as usize,
            modules: modules as usize,
        })
    }
}

/// An empty vector carries no information; treat it as absent so the SQL
/// view and the converter's view of a row never disagree.
fn non_empty(embedding: Option<&[f32]>) -> Option<&[f32]> {
    embedding.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SymbolKind, Visibility};
    use pretty_assertions::assert_eq;

    fn open_store() -> (tempfile::TempDir, SymbolStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SymbolStore::open(dir.path().join("store.db"), 2).unwrap();
        (dir, store)
    }

    fn make_symbol(name: &str) -> NewSymbol {
        let mut sym = NewSymbol::new(name, SymbolKind::Proc, "testmod", "/src/testmod.nim", 5, 6);
        sym.signature = format!("proc {name}()");
        sym.visibility = Visibility::Public;
        sym
    }

    #[test]
    fn insert_assigns_distinct_positive_ids() {
        let (_dir, store) = open_store();
        let sym = make_symbol("repeated");

        let id1 = store.insert_symbol(&sym).unwrap();
        let id2 = store.insert_symbol(&sym).unwrap();

        assert!(id1 > 0);
        assert!(id2 > 0);
        assert_ne!(id1, id2, "identical inserts must append, not dedup");
    }

    #[test]
    fn get_symbol_roundtrip() {
        let (_dir, store) = open_store();
        let mut sym = make_symbol("parseInt");
        sym.documentation = "Parses an integer.".into();
        sym.combined_embedding = Some(vec![0.1, 0.2, 0.3]);
        sym.embedding_model = Some("nomic-embed-text".into());
        sym.embedding_version = Some("1".into());

        let id = store.insert_symbol(&sym).unwrap();
        let fetched = store.get_symbol_by_id(id).unwrap().unwrap();

        assert_eq!(fetched.id, id);
        assert_eq!(fetched.name, "parseInt");
        assert_eq!(fetched.kind, SymbolKind::Proc);
        assert_eq!(fetched.visibility, Visibility::Public);
        assert_eq!(fetched.documentation, "Parses an integer.");
        assert_eq!(fetched.combined_embedding, Some(vec![0.1, 0.2, 0.3]));
    }

    #[test]
    fn absent_id_is_none_not_error() {
        let (_dir, store) = open_store();
        assert!(store.get_symbol_by_id(99_999).unwrap().is_none());
        assert!(store.get_symbol_by_id(-1).unwrap().is_none());
        assert!(store.get_symbol_by_id(0).unwrap().is_none());
    }

    #[test]
    fn update_embeddings_partial() {
        let (_dir, store) = open_store();
        let mut sym = make_symbol("withDocs");
        sym.doc_embedding = Some(vec![9.0, 9.0]);
        let id = store.insert_symbol(&sym).unwrap();

        let changed = store
            .update_symbol_embeddings(
                id,
                Some(&[1.0, 0.0]),
                None,
                None,
                Some(&[0.5, 0.5]),
                "nomic-embed-text",
                "1",
            )
            .unwrap();
        assert!(changed);

        let fetched = store.get_symbol_by_id(id).unwrap().unwrap();
        assert_eq!(fetched.name_embedding, Some(vec![1.0, 0.0]));
        assert_eq!(fetched.doc_embedding, Some(vec![9.0, 9.0]), "None must leave field unchanged");
        assert_eq!(fetched.combined_embedding, Some(vec![0.5, 0.5]));
        assert_eq!(fetched.embedding_model.as_deref(), Some("nomic-embed-text"));
        assert_eq!(fetched.embedding_version.as_deref(), Some("1"));
    }

    #[test]
    fn empty_slice_update_leaves_fields_unchanged() {
        let (_dir, store) = open_store();
        let mut sym = make_symbol("keepVectors");
        sym.doc_embedding = Some(vec![9.0, 9.0]);
        sym.combined_embedding = Some(vec![1.0, 2.0]);
        let id = store.insert_symbol(&sym).unwrap();

        let changed = store
            .update_symbol_embeddings(id, None, None, Some(&[]), Some(&[]), "m", "1")
            .unwrap();
        assert!(changed);

        let fetched = store.get_symbol_by_id(id).unwrap().unwrap();
        assert_eq!(fetched.doc_embedding, Some(vec![9.0, 9.0]));
        assert_eq!(fetched.combined_embedding, Some(vec![1.0, 2.0]));
    }

    #[test]
    fn empty_vectors_do_not_count_as_embeddings() {
        let (_dir, store) = open_store();
        let mut sym = make_symbol("emptyVector");
        sym.combined_embedding = Some(Vec::new());
        let id = store.insert_symbol(&sym).unwrap();

        let fetched = store.get_symbol_by_id(id).unwrap().unwrap();
        assert!(fetched.combined_embedding.is_none());

        let stats = store.get_embedding_stats().unwrap();
        assert_eq!(stats.with_any_embedding, 0);
        assert_eq!(stats.with_combined_embedding, 0);
    }

    #[test]
    fn update_embeddings_missing_row_is_false() {
        let (_dir, store) = open_store();
        let changed = store
            .update_symbol_embeddings(4242, Some(&[1.0]), None, None, None, "m", "1")
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn module_crud() {
        let (_dir, store) = open_store();
        let module = NewModule {
            name: "core/parser".into(),
            file_path: "/src/core/parser.nim".into(),
            last_modified: Some("2026-08-20T12:00:00Z".into()),
            documentation: "Parser utilities.".into(),
        };

        let id = store.insert_module(&module).unwrap();
        assert!(id > 0);

        let found = store.find_module("core/parser").unwrap().unwrap();
        assert_eq!(found.file_path, "/src/core/parser.nim");

        assert!(store.find_module("nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_module_names_are_allowed() {
        let (_dir, store) = open_store();
        let module = NewModule {
            name: "dup".into(),
            file_path: "/a/dup.nim".into(),
            last_modified: None,
            documentation: String::new(),
        };
        store.insert_module(&module).unwrap();
        store.insert_module(&module).unwrap();

        assert_eq!(store.get_modules().unwrap().len(), 2);
        assert!(store.find_module("dup").unwrap().is_some());
    }

    #[test]
    fn embedding_stats_counts() {
        let (_dir, store) = open_store();

        store.insert_symbol(&make_symbol("bare")).unwrap();

        let mut with_doc = make_symbol("docOnly");
        with_doc.doc_embedding = Some(vec![1.0]);
        store.insert_symbol(&with_doc).unwrap();

        let mut with_combined = make_symbol("combined");
        with_combined.combined_embedding = Some(vec![1.0, 2.0]);
        store.insert_symbol(&with_combined).unwrap();

        store
            .insert_module(&NewModule {
                name: "m".into(),
                file_path: "/m.nim".into(),
                last_modified: None,
                documentation: String::new(),
            })
            .unwrap();

        let stats = store.get_embedding_stats().unwrap();
        assert_eq!(
            stats,
            EmbeddingStats {
                symbols: 3,
                with_any_embedding: 2,
                with_combined_embedding: 1,
                modules: 1,
            }
        );
    }
}
