//! Nimdex — Nim codebase indexing and semantic symbol search.
//!
//! Extracts declarations from Nim source files into a queryable SQLite
//! store, enriches them with vector embeddings from an Ollama-compatible
//! provider, and answers lexical and cosine-similarity queries over them.

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod observability;
pub mod store;
pub mod types;
