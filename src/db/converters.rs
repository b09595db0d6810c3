//! Row → domain type conversion.
//!
//! Columns are read by name so the converters stay valid regardless of the
//! SELECT column order. Embedding columns hold JSON arrays; malformed or
//! NULL values convert to `None` rather than erroring, since a symbol with
//! no embeddings is fully valid.

use rusqlite::Row;

use crate::embedding::serialize::json_to_embedding;
use crate::types::{Module, Symbol, SymbolKind, Visibility};

/// Convert one `symbols` row into a `Symbol`.
pub fn row_to_symbol(row: &Row<'_>) -> rusqlite::Result<Symbol> {
    let kind_str: String = row.get("kind")?;
    let visibility_str: String = row.get("visibility")?;

    Ok(Symbol {
        id: row.get("id")?,
        name: row.get("name")?,
        kind: SymbolKind::from_str_loose(&kind_str).unwrap_or(SymbolKind::Proc),
        module: row.get("module")?,
        file_path: row.get("file_path")?,
        line: row.get("line")?,
        col: row.get("col")?,
        signature: row.get("signature")?,
        documentation: row.get("documentation")?,
        visibility: Visibility::from_str_loose(&visibility_str).unwrap_or(Visibility::Private),
        name_embedding: embedding_column(row, "name_embedding")?,
        signature_embedding: embedding_column(row, "signature_embedding")?,
        doc_embedding: embedding_column(row, "doc_embedding")?,
        combined_embedding: embedding_column(row, "combined_embedding")?,
        embedding_model: row.get("embedding_model")?,
        embedding_version: row.get("embedding_version")?,
    })
}

/// Convert one `modules` row into a `Module`.
pub fn row_to_module(row: &Row<'_>) -> rusqlite::Result<Module> {
    Ok(Module {
        id: row.get("id")?,
        name: row.get("name")?,
        file_path: row.get("file_path")?,
        last_modified: row.get("last_modified")?,
        documentation: row.get("documentation")?,
    })
}

fn embedding_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Vec<f32>>> {
    let raw: Option<String> = row.get(column)?;
    Ok(raw.and_then(|json| {
        let vec = json_to_embedding(&json);
        if vec.is_empty() {
            None
        } else {
            Some(vec)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::initialize_database(&conn).unwrap();
        conn
    }

    #[test]
    fn converts_full_symbol_row() {
        let conn = setup();
        conn.execute(
            "INSERT INTO symbols (name, kind, module, file_path, line, col, signature, documentation, visibility, combined_embedding, embedding_model, embedding_version)
             VALUES ('findMe', 'proc', 'search', '/src/search.nim', 3, 6, 'proc findMe(): int', 'Finds things.', 'public', '[0.5,0.25]', 'nomic-embed-text', '1')",
            [],
        )
        .unwrap();

        let sym = conn
            .query_row("SELECT * FROM symbols", [], |row| row_to_symbol(row))
            .unwrap();

        assert_eq!(sym.name, "findMe");
        assert_eq!(sym.kind, SymbolKind::Proc);
        assert_eq!(sym.visibility, Visibility::Public);
        assert_eq!(sym.line, 3);
        assert_eq!(sym.combined_embedding, Some(vec![0.5, 0.25]));
        assert!(sym.name_embedding.is_none());
    }

    #[test]
    fn malformed_embedding_json_becomes_none() {
        let conn = setup();
        conn.execute(
            "INSERT INTO symbols (name, kind, module, file_path, line, col, combined_embedding)
             VALUES ('x', 'type', 'm', '/m.nim', 1, 1, 'not a json array')",
            [],
        )
        .unwrap();

        let sym = conn
            .query_row("SELECT * FROM symbols", [], |row| row_to_symbol(row))
            .unwrap();
        assert!(sym.combined_embedding.is_none());
    }

    #[test]
    fn unknown_kind_falls_back() {
        let conn = setup();
        conn.execute(
            "INSERT INTO symbols (name, kind, module, file_path, line, col)
             VALUES ('x', 'mystery', 'm', '/m.nim', 1, 1)",
            [],
        )
        .unwrap();

        let sym = conn
            .query_row("SELECT * FROM symbols", [], |row| row_to_symbol(row))
            .unwrap();
        assert_eq!(sym.kind, SymbolKind::Proc);
    }

    #[test]
    fn converts_module_row() {
        let conn = setup();
        conn.execute(
            "INSERT INTO modules (name, file_path, last_modified, documentation)
             VALUES ('vecmath', '/src/vecmath.nim', '2026-08-01T00:00:00Z', 'Vector math.')",
            [],
        )
        .unwrap();

        let module = conn
            .query_row("SELECT * FROM modules", [], |row| row_to_module(row))
            .unwrap();
        assert_eq!(module.name, "vecmath");
        assert_eq!(module.last_modified.as_deref(), Some("2026-08-01T00:00:00Z"));
    }
}
