//! End-to-end tests: index a fixture project, then query the store.

use std::fs;

use nimdex::embedding::{EmbeddingGenerator, OllamaClient};
use nimdex::indexer::{IndexOptions, IndexingPipeline};
use nimdex::store::SymbolStore;
use nimdex::types::{NewSymbol, SymbolKind, Visibility};

fn fixture_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("geometry")).unwrap();

    fs::write(
        src.join("search.nim"),
        "\
## Symbol lookup helpers.

## Finds the thing you asked for.
proc findMe*(needle: string): int =
  discard

proc findMeToo*(needle: string, haystack: seq[string]): int =
  discard

proc ((((broken

## Internal helper.
proc searchImpl(pattern: string): int =
  discard
",
    )
    .unwrap();

    fs::write(
        src.join("geometry").join("vec.nim"),
        "\
## 3D vector math.

type
  Vec3* = object
    x*, y*, z*: float

proc `+`*(a, b: Vec3): Vec3 =
  discard

const origin* = Vec3()
",
    )
    .unwrap();
    dir
}

fn open_store() -> (tempfile::TempDir, SymbolStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SymbolStore::open(dir.path().join("engine.db"), 4).unwrap();
    (dir, store)
}

#[test]
fn index_then_search_end_to_end() {
    let project = fixture_project();
    let (_db, store) = open_store();

    let report = IndexingPipeline::new(&store, None)
        .index_project(&IndexOptions::new(project.path()), None);

    assert!(report.success, "a broken declaration must not fail the run");
    assert_eq!(report.modules_indexed, 2);

    // Substring search is case-sensitive and ANDs with other filters.
    let hits = store.search_symbols("findMe", "", "", 10).unwrap();
    let names: Vec<&str> = hits.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["findMe", "findMeToo"]);
    assert_eq!(hits[0].documentation, "Finds the thing you asked for.");
    assert_eq!(hits[0].visibility, Visibility::Public);
    assert_eq!(hits[0].module, "search");

    let procs_in_vec = store.search_symbols("", "proc", "geometry/vec", 10).unwrap();
    assert_eq!(procs_in_vec.len(), 1);
    assert_eq!(procs_in_vec[0].name, "+");

    // Modules resolved with src stripped and slash-joined components.
    let vec_module = store.find_module("geometry/vec").unwrap().unwrap();
    assert_eq!(vec_module.documentation, "3D vector math.");
}

#[test]
fn nonexistent_project_is_reported_not_thrown() {
    let (_db, store) = open_store();
    let report = IndexingPipeline::new(&store, None)
        .index_project(&IndexOptions::new("/no/such/project"), None);
    assert!(!report.success);
    assert_eq!(report.symbols_indexed, 0);
    assert_eq!(report.modules_indexed, 0);
}

#[test]
fn provider_outage_still_indexes_metadata() {
    let project = fixture_project();
    let (_db, store) = open_store();

    let client = OllamaClient::new("http://127.0.0.1:1", 1).unwrap();
    let generator = EmbeddingGenerator::new(client, "nomic-embed-text", 16);

    let mut options = IndexOptions::new(project.path());
    options.generate_embeddings = true;
    let report = IndexingPipeline::new(&store, Some(&generator)).index_project(&options, None);

    assert!(report.success);
    assert!(report.symbols_indexed > 0);
    let stats = store.get_embedding_stats().unwrap();
    assert_eq!(stats.with_any_embedding, 0);
    assert_eq!(stats.symbols, report.symbols_indexed);
}

#[test]
fn semantic_ranking_after_manual_embedding() {
    let (_db, store) = open_store();

    let mut close = NewSymbol::new("parseJson", SymbolKind::Proc, "json", "/src/json.nim", 1, 6);
    close.visibility = Visibility::Public;
    close.combined_embedding = Some(vec![0.9, 0.1, 0.0]);
    let close_id = store.insert_symbol(&close).unwrap();

    let mut far = NewSymbol::new("drawCircle", SymbolKind::Proc, "gfx", "/src/gfx.nim", 1, 6);
    far.combined_embedding = Some(vec![0.0, 0.0, 1.0]);
    store.insert_symbol(&far).unwrap();

    let plain = NewSymbol::new("noVector", SymbolKind::Proc, "misc", "/src/misc.nim", 1, 6);
    store.insert_symbol(&plain).unwrap();

    let results = store
        .semantic_search_symbols(&[1.0, 0.0, 0.0], "", "", "", 10)
        .unwrap();

    assert_eq!(results.len(), 2, "rows without a combined vector are excluded");
    assert_eq!(results[0].symbol.id, close_id);
    assert!(results[0].similarity_score > results[1].similarity_score);
    for result in &results {
        assert!((0.0..=2.0).contains(&result.distance));
        assert!((0.0..=1.0).contains(&result.similarity_score));
    }
}

#[test]
fn reindex_appends_rows() {
    let project = fixture_project();
    let (_db, store) = open_store();
    let pipeline = IndexingPipeline::new(&store, None);
    let options = IndexOptions::new(project.path());

    let first = pipeline.index_project(&options, None);
    pipeline.index_project(&options, None);

    let stats = store.get_embedding_stats().unwrap();
    assert_eq!(stats.symbols, first.symbols_indexed * 2);
    assert_eq!(stats.modules, first.modules_indexed * 2);
}
