//! Configuration schema and multi-source loading.

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigOverrides};
pub use schema::{DatabaseConfig, EmbeddingConfig, IndexingConfig, NimdexConfig};
