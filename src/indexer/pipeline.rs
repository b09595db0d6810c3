//! Project-level indexing orchestration.
//!
//! Walks a project tree (gitignore-aware), runs the extractor and module
//! resolver per file, optionally enriches symbols with embeddings, and
//! reports aggregate counts. Failures at file or symbol granularity are
//! logged and skipped; only a missing project directory fails the run.

use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::embedding::{EmbeddingGenerator, EMBEDDING_VERSION};
use crate::indexer::extractor::SymbolExtractor;
use crate::indexer::modules::ModuleResolver;
use crate::store::SymbolStore;
use crate::types::{NewModule, NewSymbol};

/// Files larger than this are skipped (generated bindings, vendored blobs).
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub project_dir: PathBuf,
    pub generate_embeddings: bool,
    pub max_file_size: u64,
}

impl IndexOptions {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            generate_embeddings: false,
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

/// Aggregate outcome of one indexing run.
///
/// `success` is false only when the project directory itself was unusable;
/// per-file and per-symbol problems are skipped, not fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub success: bool,
    pub symbols_indexed: usize,
    pub modules_indexed: usize,
}

impl IndexReport {
    fn failed() -> Self {
        Self {
            success: false,
            symbols_indexed: 0,
            modules_indexed: 0,
        }
    }
}

/// Progress events delivered to the caller-supplied callback.
#[derive(Debug, Clone)]
pub enum IndexProgress {
    Started { total_files: usize },
    FileStarted { path: PathBuf, index: usize },
    FileDone { path: PathBuf, symbols: usize },
    Finished { symbols: usize, modules: usize },
}

pub struct IndexingPipeline<'a> {
    store: &'a SymbolStore,
    embedder: Option<&'a EmbeddingGenerator>,
    extractor: SymbolExtractor,
    resolver: ModuleResolver,
}

impl<'a> IndexingPipeline<'a> {
    pub fn new(store: &'a SymbolStore, embedder: Option<&'a EmbeddingGenerator>) -> Self {
        Self {
            store,
            embedder,
            extractor: SymbolExtractor::new(),
            resolver: ModuleResolver::new(),
        }
    }

    /// Index every Nim file under `options.project_dir`.
    ///
    /// Progress is reported through the explicit callback; there is no
    /// process-global state. Indexing is append-only: re-running over the
    /// same store adds rows and never prunes earlier ones.
    pub fn index_project(
        &self,
        options: &IndexOptions,
        progress: Option<&dyn Fn(&IndexProgress)>,
    ) -> IndexReport {
        if !options.project_dir.is_dir() {
            warn!(
                "project directory not found: {}",
                options.project_dir.display()
            );
            return IndexReport::failed();
        }

        let files = collect_nim_files(options);
        info!(
            "indexing {} Nim files under {}",
            files.len(),
            options.project_dir.display()
        );
        emit(progress, IndexProgress::Started {
            total_files: files.len(),
        });

        // Probe the provider once per run; an unreachable provider degrades
        // the whole run to metadata-only rather than failing per symbol.
        let embedder = match (options.generate_embeddings, self.embedder) {
            (true, Some(gen)) if gen.is_available() => {
                gen.ensure_model();
                Some(gen)
            }
            (true, _) => {
                warn!("embedding provider unavailable, indexing metadata only");
                None
            }
            (false, _) => None,
        };

        let mut symbols_indexed = 0;
        let mut modules_indexed = 0;

        for (index, path) in files.iter().enumerate() {
            emit(progress, IndexProgress::FileStarted {
                path: path.clone(),
                index,
            });

            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("skipping unreadable file {}: {e}", path.display());
                    emit(progress, IndexProgress::FileDone {
                        path: path.clone(),
                        symbols: 0,
                    });
                    continue;
                }
            };

            let module_name = self.resolver.module_name(path, &options.project_dir);
            let module = NewModule {
                name: module_name.clone(),
                file_path: path.to_string_lossy().into_owned(),
                last_modified: last_modified(path),
                documentation: self.resolver.module_doc(&source),
            };
            match self.store.insert_module(&module) {
                Ok(_) => modules_indexed += 1,
                Err(e) => {
                    warn!("failed to record module {module_name}: {e}");
                    emit(progress, IndexProgress::FileDone {
                        path: path.clone(),
                        symbols: 0,
                    });
                    continue;
                }
            }

            let mut symbols: Vec<NewSymbol> = self
                .extractor
                .extract(&source)
                .into_iter()
                .map(|decl| {
                    let mut symbol = NewSymbol::new(
                        decl.name,
                        decl.kind,
                        module_name.clone(),
                        path.to_string_lossy().into_owned(),
                        decl.line,
                        decl.col,
                    );
                    symbol.signature = decl.signature;
                    symbol.documentation = decl.documentation;
                    symbol.visibility = decl.visibility;
                    symbol
                })
                .collect();

            if let Some(gen) = embedder {
                enrich_batch(gen, &mut symbols);
            }

            let mut file_symbols = 0;
            for symbol in &symbols {
                match self.store.insert_symbol(symbol) {
                    Ok(_) => file_symbols += 1,
                    Err(e) => warn!("failed to store symbol in {module_name}: {e}"),
                }
            }
            symbols_indexed += file_symbols;

            emit(progress, IndexProgress::FileDone {
                path: path.clone(),
                symbols: file_symbols,
            });
        }

        info!("indexed {symbols_indexed} symbols across {modules_indexed} modules");
        emit(progress, IndexProgress::Finished {
            symbols: symbols_indexed,
            modules: modules_indexed,
        });

        IndexReport {
            success: true,
            symbols_indexed,
            modules_indexed,
        }
    }
}

/// Attach whichever embeddings the provider can produce, batching all of a
/// file's texts so round trips amortize across symbols. Blank fields and
/// individual failures leave the corresponding slot empty.
fn enrich_batch(gen: &EmbeddingGenerator, symbols: &mut [NewSymbol]) {
    if symbols.is_empty() {
        return;
    }

    let mut texts = Vec::with_capacity(symbols.len() * 4);
    for symbol in symbols.iter() {
        texts.extend(gen.symbol_texts(
            &symbol.name,
            &symbol.module,
            &symbol.signature,
            &symbol.documentation,
        ));
    }

    let results = gen.embed_batch(&texts);

    for (symbol, chunk) in symbols.iter_mut().zip(results.chunks_exact(4)) {
        for (slot, result) in [
            (&mut symbol.name_embedding, &chunk[0]),
            (&mut symbol.signature_embedding, &chunk[1]),
            (&mut symbol.doc_embedding, &chunk[2]),
            (&mut symbol.combined_embedding, &chunk[3]),
        ] {
            if result.success {
                *slot = Some(result.embedding.clone());
            } else {
                debug!("embedding skipped for {}: {}", symbol.name, result.error);
            }
        }

        if symbol.name_embedding.is_some() || symbol.combined_embedding.is_some() {
            symbol.embedding_model = Some(gen.model().to_string());
            symbol.embedding_version = Some(EMBEDDING_VERSION.to_string());
        }
    }
}

/// All `.nim` files under the project, gitignore-aware, in sorted order so
/// runs are deterministic.
fn collect_nim_files(options: &IndexOptions) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(&options.project_dir)
        .standard_filters(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.path().extension().map(|e| e == "nim").unwrap_or(false))
        .filter(|entry| {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > options.max_file_size {
                warn!("skipping oversized file {}", entry.path().display());
                return false;
            }
            true
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn last_modified(path: &std::path::Path) -> Option<String> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(secs.to_string())
}

fn emit(progress: Option<&dyn Fn(&IndexProgress)>, event: IndexProgress) {
    if let Some(cb) = progress {
        cb(&event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
