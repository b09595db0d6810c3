//! Lexical and semantic query evaluation.
//!
//! Lexical search composes filters into one SQL statement. Semantic search
//! retrieves candidates through the vec0 KNN index when it is usable and
//! falls back to a full scan of embedded rows otherwise; either way the
//! final distance and similarity are recomputed exactly in Rust from the
//! scalar JSON columns, so both paths rank identically.

use std::cmp::Ordering;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use tracing::debug;

use crate::db::converters::row_to_symbol;
use crate::embedding::serialize::vec_to_blob;
use crate::error::Result;
use crate::store::SymbolStore;
use crate::types::{SearchResult, Symbol};

const KNN_SQL: &str = "\
SELECT symbol_id FROM vec_symbols
WHERE embedding MATCH ?1
ORDER BY distance
LIMIT ?2";

/// Cosine similarity over the zipped prefix of the two vectors.
///
/// Returns 0.0 when either vector has zero norm; normalization of the
/// inputs is not assumed.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl SymbolStore {
    /// Lexical symbol search.
    ///
    /// Non-empty filters are ANDed: `name_pattern` is a case-sensitive
    /// substring match, `kind` and `module` are exact. All-empty filters
    /// act as a wildcard. Results come back in id order, capped at `limit`.
    pub fn search_symbols(
        &self,
        name_pattern: &str,
        kind: &str,
        module: &str,
        limit: usize,
    ) -> Result<Vec<Symbol>> {
        let mut sql = String::from("SELECT * FROM symbols");
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !name_pattern.is_empty() {
            // instr() is byte-wise and case-sensitive, unlike LIKE.
            clauses.push("instr(name, ?) > 0");
            values.push(Value::Text(name_pattern.to_string()));
        }
        if !kind.is_empty() {
            clauses.push("kind = ?");
            values.push(Value::Text(kind.to_string()));
        }
        if !module.is_empty() {
            clauses.push("module = ?");
            values.push(Value::Text(module.to_string()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id LIMIT ?");
        values.push(Value::Integer(limit as i64));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row_to_symbol(row))?;

        let mut symbols = Vec::new();
        for symbol in rows {
            symbols.push(symbol?);
        }
        Ok(symbols)
    }

    /// Semantic similarity search over symbols with a combined embedding.
    ///
    /// `query` is the already-embedded query vector. Filters behave as in
    /// `search_symbols` and are applied before ranking. Results are sorted
    /// by similarity descending, ties broken by ascending id.
    pub fn semantic_search_symbols(
        &self,
        query: &[f32],
        name_pattern: &str,
        kind: &str,
        module: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 || query.is_empty() {
            return Ok(Vec::new());
        }

        let filtered = !name_pattern.is_empty() || !kind.is_empty() || !module.is_empty();

        // KNN can only pre-rank the unfiltered case; with filters active the
        // candidate set must come from the scalar table so the filters do not
        // starve the top-k.
        let candidates = if filtered {
            self.scan_embedded(name_pattern, kind, module)?
        } else {
            let ids = self.knn_candidate_ids(query, limit)?;
            if ids.is_empty() {
                self.scan_embedded("", "", "")?
            } else {
                self.fetch_by_ids(&ids)?
            }
        };

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|symbol| {
                let embedding = symbol.combined_embedding.as_deref()?;
                let s = cosine_similarity(query, embedding);
                Some(SearchResult {
                    distance: (1.0 - s).clamp(0.0, 2.0),
                    similarity_score: ((1.0 + s) / 2.0).clamp(0.0, 1.0),
                    symbol,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.symbol.id.cmp(&b.symbol.id))
        });
        results.truncate(limit);
        Ok(results)
    }

    /// Candidate ids from the vec0 KNN index, oversampled past `limit` so
    /// exact re-ranking has room to reorder. Any vec0 failure (extension
    /// missing, dimension mismatch) degrades to an empty set.
    fn knn_candidate_ids(&self, query: &[f32], limit: usize) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let k = limit.saturating_mul(4).clamp(50, 4096) as i64;
        let blob = vec_to_blob(query);

        let mut stmt = match conn.prepare(KNN_SQL) {
            Ok(stmt) => stmt,
            Err(e) => {
                debug!("vec0 KNN unavailable: {e}");
                return Ok(Vec::new());
            }
        };
        let rows = match stmt.query_map(params![blob, k], |row| row.get::<_, i64>(0)) {
            Ok(rows) => rows,
            Err(e) => {
                debug!("vec0 KNN query failed: {e}");
                return Ok(Vec::new());
            }
        };
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<Symbol>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM symbols WHERE id IN ({placeholders})");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let values: Vec<Value> = ids.iter().map(|&id| Value::Integer(id)).collect();
        let rows = stmt.query_map(params_from_iter(values), |row| row_to_symbol(row))?;

        let mut symbols = Vec::new();
        for symbol in rows {
            symbols.push(symbol?);
        }
        Ok(symbols)
    }

    /// All rows carrying a combined embedding, optionally filtered.
    fn scan_embedded(&self, name_pattern: &str, kind: &str, module: &str) -> Result<Vec<Symbol>> {
        let mut sql = String::from("SELECT * FROM symbols WHERE combined_embedding IS NOT NULL");
        let mut values: Vec<Value> = Vec::new();

        if !name_pattern.is_empty() {
            sql.push_str(" AND instr(name, ?) > 0");
            values.push(Value::Text(name_pattern.to_string()));
        }
        if !kind.is_empty() {
            sql.push_str(" AND kind = ?");
            values.push(Value::Text(kind.to_string()));
        }
        if !module.is_empty() {
            sql.push_str(" AND module = ?");
            values.push(Value::Text(module.to_string()));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row_to_symbol(row))?;

        let mut symbols = Vec::new();
        for symbol in rows {
            symbols.push(symbol?);
        }
        Ok(symbols)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
