//! Indexing: declaration extraction, module resolution, and the
//! project-level orchestration pipeline.

pub mod extractor;
pub mod modules;
pub mod pipeline;

pub use extractor::{Declaration, SymbolExtractor};
pub use modules::ModuleResolver;
pub use pipeline::{IndexOptions, IndexProgress, IndexReport, IndexingPipeline};
