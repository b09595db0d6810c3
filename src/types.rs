//! Core domain types for Nimdex.
//!
//! `Symbol` and `Module` mirror the database rows one-to-one; the `New*`
//! variants carry the caller-supplied fields before the store assigns an
//! identifier. `SearchResult` and `EmbeddingResult` are transient
//! query-time / provider-call values and are never persisted directly.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SymbolKind
// ---------------------------------------------------------------------------

/// Kinds of Nim declarations the extractor recognises.
///
/// String forms match the Nim declaration keywords so that kind filters in
/// queries read naturally ("proc", "type", "const", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Proc,
    Func,
    Method,
    Iterator,
    Converter,
    Template,
    Macro,
    Type,
    Const,
    Var,
    Let,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proc => "proc",
            Self::Func => "func",
            Self::Method => "method",
            Self::Iterator => "iterator",
            Self::Converter => "converter",
            Self::Template => "template",
            Self::Macro => "macro",
            Self::Type => "type",
            Self::Const => "const",
            Self::Var => "var",
            Self::Let => "let",
        }
    }

    /// Parse from a declaration keyword or loose user input.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "proc" | "procedure" => Some(Self::Proc),
            "func" | "function" => Some(Self::Func),
            "method" => Some(Self::Method),
            "iterator" => Some(Self::Iterator),
            "converter" => Some(Self::Converter),
            "template" => Some(Self::Template),
            "macro" => Some(Self::Macro),
            "type" => Some(Self::Type),
            "const" | "constant" => Some(Self::Const),
            "var" | "variable" => Some(Self::Var),
            "let" => Some(Self::Let),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Whether a declaration carries the Nim export marker (`*`).
///
/// Derived purely lexically — no cross-file resolution is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "public" | "exported" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// One indexed declaration occurrence.
///
/// The four embedding vectors are optional — a symbol with no embeddings is
/// a fully valid, queryable row. `embedding_model` and `embedding_version`
/// tag the vectors so stale ones can be invalidated when the model changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: i64,
    pub name: String,
    pub kind: SymbolKind,
    pub module: String,
    pub file_path: String,
    /// 1-based source line of the declaration.
    pub line: u32,
    /// 1-based source column of the declared name.
    pub col: u32,
    pub signature: String,
    pub documentation: String,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_version: Option<String>,
}

impl Symbol {
    /// True if at least one of the four embedding slots is populated.
    pub fn has_any_embedding(&self) -> bool {
        self.name_embedding.is_some()
            || self.signature_embedding.is_some()
            || self.doc_embedding.is_some()
            || self.combined_embedding.is_some()
    }
}

/// Caller-supplied fields for `SymbolStore::insert_symbol`.
///
/// Inserts are append-only: the store assigns a fresh identifier on every
/// call, with no natural-key dedup.
#[derive(Debug, Clone)]
pub struct NewSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub module: String,
    pub file_path: String,
    pub line: u32,
    pub col: u32,
    pub signature: String,
    pub documentation: String,
    pub visibility: Visibility,
    pub name_embedding: Option<Vec<f32>>,
    pub signature_embedding: Option<Vec<f32>>,
    pub doc_embedding: Option<Vec<f32>>,
    pub combined_embedding: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
    pub embedding_version: Option<String>,
}

impl NewSymbol {
    /// A symbol with the required fields set and everything else empty.
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        module: impl Into<String>,
        file_path: impl Into<String>,
        line: u32,
        col: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            module: module.into(),
            file_path: file_path.into(),
            line,
            col,
            signature: String::new(),
            documentation: String::new(),
            visibility: Visibility::Private,
            name_embedding: None,
            signature_embedding: None,
            doc_embedding: None,
            combined_embedding: None,
            embedding_model: None,
            embedding_version: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// One logical compilation unit (a Nim source file).
///
/// Multiple rows may share a name — no uniqueness constraint is enforced,
/// and `find_module` returns one matching row, not necessarily the newest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub documentation: String,
}

/// Caller-supplied fields for `SymbolStore::insert_module`.
#[derive(Debug, Clone)]
pub struct NewModule {
    pub name: String,
    pub file_path: String,
    pub last_modified: Option<String>,
    pub documentation: String,
}

// ---------------------------------------------------------------------------
// EmbeddingResult
// ---------------------------------------------------------------------------

/// Outcome of one embedding-generation call.
///
/// Failures are represented as data — a provider or validation error never
/// surfaces as a panic or an `Err` from the generator's strategy methods.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    pub success: bool,
    pub embedding: Vec<f32>,
    pub error: String,
}

impl EmbeddingResult {
    pub fn ok(embedding: Vec<f32>) -> Self {
        Self {
            success: true,
            embedding,
            error: String::new(),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            embedding: Vec::new(),
            error: error.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SearchResult
// ---------------------------------------------------------------------------

/// One ranked semantic search hit.
///
/// `distance = 1 − cosine` clamped to [0, 2]; `similarity_score =
/// (1 + cosine) / 2` clamped to [0, 1]. Both are derived at query time.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub symbol: Symbol,
    pub distance: f64,
    pub similarity_score: f64,
}

// ---------------------------------------------------------------------------
// EmbeddingStats
// ---------------------------------------------------------------------------

/// Aggregate counts over the stored index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddingStats {
    pub symbols: usize,
    /// Symbols carrying at least one non-empty embedding vector.
    pub with_any_embedding: usize,
    /// Symbols carrying a combined embedding (eligible for semantic search).
    pub with_combined_embedding: usize,
    pub modules: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [SymbolKind; 11] = [
        SymbolKind::Proc,
        SymbolKind::Func,
        SymbolKind::Method,
        SymbolKind::Iterator,
        SymbolKind::Converter,
        SymbolKind::Template,
        SymbolKind::Macro,
        SymbolKind::Type,
        SymbolKind::Const,
        SymbolKind::Var,
        SymbolKind::Let,
    ];

    #[test]
    fn symbol_kind_roundtrip() {
        for kind in ALL_KINDS {
            assert_eq!(SymbolKind::from_str_loose(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn symbol_kind_aliases() {
        assert_eq!(SymbolKind::from_str_loose("procedure"), Some(SymbolKind::Proc));
        assert_eq!(SymbolKind::from_str_loose("FUNCTION"), Some(SymbolKind::Func));
        assert_eq!(SymbolKind::from_str_loose("constant"), Some(SymbolKind::Const));
        assert_eq!(SymbolKind::from_str_loose("variable"), Some(SymbolKind::Var));
        assert_eq!(SymbolKind::from_str_loose("unknown"), None);
        assert_eq!(SymbolKind::from_str_loose(""), None);
    }

    #[test]
    fn visibility_roundtrip() {
        for vis in [Visibility::Public, Visibility::Private] {
            assert_eq!(Visibility::from_str_loose(vis.as_str()), Some(vis));
        }
        assert_eq!(Visibility::from_str_loose("exported"), Some(Visibility::Public));
        assert_eq!(Visibility::from_str_loose("other"), None);
    }

    #[test]
    fn new_symbol_defaults() {
        let sym = NewSymbol::new("parseInt", SymbolKind::Proc, "strutils", "/src/strutils.nim", 10, 6);
        assert_eq!(sym.name, "parseInt");
        assert_eq!(sym.visibility, Visibility::Private);
        assert!(sym.signature.is_empty());
        assert!(sym.combined_embedding.is_none());
    }

    #[test]
    fn has_any_embedding() {
        let mut sym = Symbol {
            id: 1,
            name: "x".into(),
            kind: SymbolKind::Proc,
            module: "m".into(),
            file_path: "/m.nim".into(),
            line: 1,
            col: 1,
            signature: String::new(),
            documentation: String::new(),
            visibility: Visibility::Private,
            name_embedding: None,
            signature_embedding: None,
            doc_embedding: None,
            combined_embedding: None,
            embedding_model: None,
            embedding_version: None,
        };
        assert!(!sym.has_any_embedding());
        sym.doc_embedding = Some(vec![0.1, 0.2]);
        assert!(sym.has_any_embedding());
    }

    #[test]
    fn embedding_result_constructors() {
        let ok = EmbeddingResult::ok(vec![1.0, 2.0]);
        assert!(ok.success);
        assert!(ok.error.is_empty());

        let fail = EmbeddingResult::fail("Empty name");
        assert!(!fail.success);
        assert!(fail.embedding.is_empty());
        assert_eq!(fail.error, "Empty name");
    }

    #[test]
    fn symbol_serde_roundtrip() {
        let sym = Symbol {
            id: 7,
            name: "`+`".into(),
            kind: SymbolKind::Proc,
            module: "vecmath".into(),
            file_path: "/src/vecmath.nim".into(),
            line: 12,
            col: 6,
            signature: "proc `+`(a, b: Vec3): Vec3".into(),
            documentation: "Component-wise addition.".into(),
            visibility: Visibility::Public,
            name_embedding: None,
            signature_embedding: None,
            doc_embedding: None,
            combined_embedding: Some(vec![0.1, 0.2, 0.3]),
            embedding_model: Some("nomic-embed-text".into()),
            embedding_version: Some("1".into()),
        };
        let json = serde_json::to_string(&sym).unwrap();
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "`+`");
        assert_eq!(back.kind, SymbolKind::Proc);
        assert_eq!(back.combined_embedding.as_deref(), Some(&[0.1f32, 0.2, 0.3][..]));
    }
}
