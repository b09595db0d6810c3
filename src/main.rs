//! Nimdex command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

use nimdex::config::{load_config, ConfigOverrides, NimdexConfig};
use nimdex::embedding::{EmbeddingGenerator, OllamaClient};
use nimdex::error::{NimdexError, Result};
use nimdex::indexer::{IndexOptions, IndexProgress, IndexingPipeline};
use nimdex::observability::init_logging;
use nimdex::store::SymbolStore;

#[derive(Parser)]
#[command(name = "nimdex", version, about = "Nim symbol indexing and semantic search")]
struct Cli {
    /// Database file (overrides config).
    #[arg(long, global = true)]
    db: Option<String>,

    /// Embedding provider base URL (overrides config).
    #[arg(long, global = true)]
    host: Option<String>,

    /// Embedding model name (overrides config).
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a Nim project directory.
    Index {
        directory: PathBuf,
        /// Also generate embeddings for each symbol.
        #[arg(long)]
        embeddings: bool,
    },
    /// Lexical symbol search (case-sensitive substring on the name).
    Search {
        pattern: String,
        #[arg(long, default_value = "")]
        kind: String,
        #[arg(long, default_value = "")]
        module: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Semantic similarity search over embedded symbols.
    Semantic {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Minimum similarity score; defaults to the configured threshold.
        #[arg(long)]
        min_score: Option<f64>,
    },
    /// Show index statistics.
    Stats,
    /// List indexed modules.
    Modules,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let project_dir = match &cli.command {
        Command::Index { directory, .. } => Some(directory.clone()),
        _ => std::env::current_dir().ok(),
    };
    let config = load_config(
        project_dir.as_deref(),
        &ConfigOverrides {
            db_path: cli.db.clone(),
            host: cli.host.clone(),
            model: cli.model.clone(),
        },
    );

    match run(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command, config: &NimdexConfig) -> Result<()> {
    let store = SymbolStore::open(&config.database.path, config.database.pool_size)?;

    match command {
        Command::Index { directory, embeddings } => {
            cmd_index(&store, config, directory, *embeddings)
        }
        Command::Search { pattern, kind, module, limit } => {
            cmd_search(&store, pattern, kind, module, *limit)
        }
        Command::Semantic { query, limit, min_score } => {
            let threshold = min_score.unwrap_or(config.embedding.similarity_threshold);
            cmd_semantic(&store, config, query, *limit, threshold)
        }
        Command::Stats => cmd_stats(&store),
        Command::Modules => cmd_modules(&store),
    }
}

fn build_generator(config: &NimdexConfig) -> Result<EmbeddingGenerator> {
    let client = OllamaClient::new(&config.embedding.host, config.embedding.timeout_secs)
        .map_err(NimdexError::Embedding)?;
    Ok(EmbeddingGenerator::new(
        client,
        &config.embedding.model,
        config.embedding.batch_size,
    ))
}

fn cmd_index(
    store: &SymbolStore,
    config: &NimdexConfig,
    directory: &std::path::Path,
    embeddings: bool,
) -> Result<()> {
    let generator = if embeddings {
        Some(build_generator(config)?)
    } else {
        None
    };
    let pipeline = IndexingPipeline::new(store, generator.as_ref());

    let mut options = IndexOptions::new(directory);
    options.generate_embeddings = embeddings;
    options.max_file_size = config.indexing.max_file_size;

    let bar = ProgressBar::hidden();
    let style = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let callback = |event: &IndexProgress| match event {
        IndexProgress::Started { total_files } => {
            bar.set_style(style.clone());
            bar.set_length(*total_files as u64);
            bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
        IndexProgress::FileStarted { path, .. } => {
            bar.set_message(path.display().to_string());
        }
        IndexProgress::FileDone { .. } => bar.inc(1),
        IndexProgress::Finished { .. } => bar.finish_and_clear(),
    };

    let report = pipeline.index_project(&options, Some(&callback));
    if !report.success {
        return Err(NimdexError::Other(format!(
            "project directory not found: {}",
            directory.display()
        )));
    }

    println!(
        "Indexed {} symbols across {} modules",
        report.symbols_indexed, report.modules_indexed
    );
    Ok(())
}

fn cmd_search(
    store: &SymbolStore,
    pattern: &str,
    kind: &str,
    module: &str,
    limit: usize,
) -> Result<()> {
    let symbols = store.search_symbols(pattern, kind, module, limit)?;
    if symbols.is_empty() {
        println!("No symbols found");
        return Ok(());
    }
    for sym in symbols {
        println!(
            "{:<10} {:<30} {}:{}:{}",
            sym.kind, sym.name, sym.file_path, sym.line, sym.col
        );
    }
    Ok(())
}

fn cmd_semantic(
    store: &SymbolStore,
    config: &NimdexConfig,
    query: &str,
    limit: usize,
    min_score: f64,
) -> Result<()> {
    let generator = build_generator(config)?;
    if !generator.is_available() {
        return Err(NimdexError::Embedding(format!(
            "embedding provider not reachable at {}",
            config.embedding.host
        )));
    }

    let embedded = generator.embed_text(query);
    if !embedded.success {
        return Err(NimdexError::Embedding(embedded.error));
    }

    let results = store.semantic_search_symbols(&embedded.embedding, "", "", "", limit)?;
    let mut shown = 0;
    for result in results {
        if result.similarity_score < min_score {
            continue;
        }
        println!(
            "{:.3}  {:<10} {:<30} {}",
            result.similarity_score, result.symbol.kind, result.symbol.name, result.symbol.module
        );
        shown += 1;
    }
    if shown == 0 {
        println!("No symbols above similarity {min_score}");
    }
    Ok(())
}

fn cmd_stats(store: &SymbolStore) -> Result<()> {
    let stats = store.get_embedding_stats()?;
    println!("Symbols:                {}", stats.symbols);
    println!("  with any embedding:   {}", stats.with_any_embedding);
    println!("  with combined vector: {}", stats.with_combined_embedding);
    println!("Modules:                {}", stats.modules);
    Ok(())
}

fn cmd_modules(store: &SymbolStore) -> Result<()> {
    let modules = store.get_modules()?;
    if modules.is_empty() {
        println!("No modules indexed");
        return Ok(());
    }
    for module in modules {
        println!("{:<40} {}", module.name, module.file_path);
    }
    Ok(())
}
