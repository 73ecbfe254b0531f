//! End-to-end flow: exported inputs, build, persist, load, query.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use discogs_rec::{
    EmbeddingMatrix, ForestBuilder, ForestParams, IndexError, IndexHandle, IndexMetadata,
    IndexPersistence, IndexSnapshot, MetadataCatalog, RecommendConfig, Recommender, VectorStore,
};

use crate::common::{ExportedInputs, sample_fixtures};

fn build_from_inputs(inputs: &ExportedInputs, seed: u64) -> IndexSnapshot {
    let matrix = EmbeddingMatrix::open(&inputs.embeddings).unwrap();
    let catalog = MetadataCatalog::load(&inputs.catalog).unwrap();
    let store = VectorStore::new(matrix, catalog.release_ids()).unwrap();
    let forest = ForestBuilder::new(ForestParams::new(16, 2).unwrap())
        .build_seeded(&store, seed)
        .unwrap();
    let metadata = IndexMetadata::for_forest(&forest, Some(seed), 0);
    IndexSnapshot::new(store, forest, catalog, metadata).unwrap()
}

#[test]
fn test_saved_index_answers_like_the_built_one() {
    let inputs = ExportedInputs::write(&sample_fixtures());
    let built = build_from_inputs(&inputs, 9);

    let persistence = IndexPersistence::new(inputs.index_path());
    persistence.save(&built).unwrap();
    assert!(persistence.exists());

    let loaded = persistence.load().unwrap();
    assert_eq!(loaded.forest(), built.forest());
    assert_eq!(loaded.metadata().seed, Some(9));
    assert_eq!(loaded.catalog().len(), 10);

    let before = built.search_engine(25).unwrap();
    let after = loaded.search_engine(25).unwrap();
    for row in 0..built.store().len() {
        let index = discogs_rec::ItemIndex::new(row as u32);
        assert_eq!(
            before.search_item(index, 4).unwrap(),
            after.search_item(index, 4).unwrap()
        );
    }
}

#[test]
fn test_recommend_from_loaded_index() {
    let inputs = ExportedInputs::write(&sample_fixtures());
    let persistence = IndexPersistence::new(inputs.index_path());
    persistence.save(&build_from_inputs(&inputs, 3)).unwrap();

    let recommender = Recommender::new(
        Arc::new(IndexHandle::new(persistence.load().unwrap())),
        RecommendConfig::default(),
    );
    let items = recommender
        .recommend_input("https://www.discogs.com/release/300001-Miles-Davis-Kind-Of-Blue", 2)
        .unwrap();

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.release_id.get() >= 300_000));
    assert!(items.iter().all(|item| item.release_id.get() != 300_001));
    assert_ne!(items[0].artist, items[1].artist);
}

#[test]
fn test_load_without_build_reports_not_built() {
    let inputs = ExportedInputs::write(&sample_fixtures());
    let persistence = IndexPersistence::new(inputs.index_path());

    assert!(matches!(
        persistence.load(),
        Err(IndexError::NotBuilt { .. })
    ));
}

fn run_cli(workspace: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_discogs-rec"))
        .args(args)
        .current_dir(workspace)
        .env("DISCOGS_REC_INDEX_PATH", workspace.join("index"))
        .env("NO_COLOR", "1")
        .output()
        .expect("run discogs-rec CLI");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

#[test]
fn test_cli_build_then_recommend() {
    let inputs = ExportedInputs::write(&sample_fixtures());
    let workspace = inputs.path();
    let embeddings = inputs.embeddings.to_string_lossy().to_string();
    let catalog = inputs.catalog.to_string_lossy().to_string();

    let (code, stdout, stderr) = run_cli(
        workspace,
        &[
            "build", &embeddings, &catalog, "--trees", "8", "--leaf-capacity", "2", "--seed",
            "5", "--json",
        ],
    );
    assert_eq!(code, 0, "build failed: {stderr}");
    let response: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(response["status"], "success");
    assert_eq!(response["data"]["stats"]["tree_count"], 8);
    assert_eq!(response["data"]["metadata"]["item_count"], 10);

    // A second build without --force leaves the index alone
    let (code, _, _) = run_cli(workspace, &["build", &embeddings, &catalog]);
    assert_eq!(code, 1);

    let (code, stdout, stderr) =
        run_cli(workspace, &["recommend", "249504", "--count", "2", "--json"]);
    assert_eq!(code, 0, "recommend failed: {stderr}");
    let response: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = response["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0]["url"].as_str().unwrap().contains("discogs.com/release/"));

    let (code, stdout, _) = run_cli(workspace, &["recommend", "12345", "--json"]);
    assert_eq!(code, 3);
    let response: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(response["code"], "UNKNOWN_ITEM");

    let (code, _, _) = run_cli(workspace, &["recommend", "not-a-release"]);
    assert_eq!(code, 9);
}
