//! Embedding generation: HTTP provider client, strategy-level generator,
//! and vector serialization helpers.

pub mod client;
pub mod generator;
pub mod serialize;

pub use client::OllamaClient;
pub use generator::{EmbeddingGenerator, EMBEDDING_VERSION};
