//! Configuration schema.
//!
//! Every field has a serde default so partial YAML files stay valid; the
//! loader layers sources on top of these defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NimdexConfig {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: String,
    /// Connections held by the pool.
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "nimdex.db".to_string(),
            pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of the Ollama-compatible provider.
    pub host: String,
    pub model: String,
    /// Texts sent per provider round trip.
    pub batch_size: usize,
    /// Minimum similarity_score shown by the semantic CLI command.
    pub similarity_threshold: f64,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            batch_size: 32,
            similarity_threshold: 0.5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexingConfig {
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_file_size: 2 * 1024 * 1024,
        }
    }
}
