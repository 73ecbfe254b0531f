use std::fs::File;
use std::path::{Path, PathBuf};

use discogs_rec::{
    EmbeddingMatrix, ForestBuilder, ForestParams, IndexMetadata, IndexSnapshot, MetadataCatalog,
    ReleaseId, ReleaseRecord, VectorDimension, VectorStore,
};
use tempfile::TempDir;

/// A release with its embedding, used to lay out test catalogs.
pub struct Fixture {
    pub id: u64,
    pub artist: &'static str,
    pub title: &'static str,
    pub vector: Vec<f32>,
}

impl Fixture {
    pub fn new(id: u64, artist: &'static str, title: &'static str, vector: &[f32]) -> Self {
        Self {
            id,
            artist,
            title,
            vector: vector.to_vec(),
        }
    }
}

pub fn release_id(id: u64) -> ReleaseId {
    ReleaseId::new(id).expect("release ids in fixtures are non-zero")
}

/// Two loose clusters of releases in four dimensions.
pub fn sample_fixtures() -> Vec<Fixture> {
    vec![
        Fixture::new(249504, "Aphex Twin", "Selected Ambient Works", &[1.0, 0.1, 0.0, 0.0]),
        Fixture::new(249505, "Aphex Twin", "I Care Because You Do", &[0.95, 0.15, 0.05, 0.0]),
        Fixture::new(249506, "Boards Of Canada", "Music Has The Right", &[0.9, 0.2, 0.0, 0.1]),
        Fixture::new(249507, "Autechre", "Amber", &[0.85, 0.1, 0.1, 0.05]),
        Fixture::new(249508, "Autechre", "Tri Repetae", &[0.8, 0.25, 0.0, 0.0]),
        Fixture::new(249509, "Plaid", "Not For Threes", &[0.7, 0.3, 0.1, 0.0]),
        Fixture::new(300001, "Miles Davis", "Kind Of Blue", &[0.0, 0.1, 1.0, 0.2]),
        Fixture::new(300002, "John Coltrane", "Blue Train", &[0.05, 0.0, 0.9, 0.3]),
        Fixture::new(300003, "Bill Evans", "Portrait In Jazz", &[0.1, 0.0, 0.95, 0.1]),
        Fixture::new(300004, "Miles Davis", "Milestones", &[0.0, 0.05, 0.85, 0.25]),
    ]
}

pub fn store_and_catalog(fixtures: &[Fixture]) -> (VectorStore, MetadataCatalog) {
    let dimension = VectorDimension::new(fixtures[0].vector.len()).unwrap();
    let store = VectorStore::from_items(
        dimension,
        fixtures
            .iter()
            .map(|f| (release_id(f.id), f.vector.clone()))
            .collect(),
    )
    .unwrap();
    let catalog = MetadataCatalog::from_records(
        fixtures
            .iter()
            .map(|f| ReleaseRecord::new(release_id(f.id), f.artist, f.title))
            .collect(),
    )
    .unwrap();
    (store, catalog)
}

/// Builds a seeded snapshot directly from fixtures.
pub fn build_snapshot(fixtures: &[Fixture], params: ForestParams, seed: u64) -> IndexSnapshot {
    let (store, catalog) = store_and_catalog(fixtures);
    let forest = ForestBuilder::new(params)
        .with_threads(2)
        .build_seeded(&store, seed)
        .unwrap();
    let metadata = IndexMetadata::for_forest(&forest, Some(seed), 0);
    IndexSnapshot::new(store, forest, catalog, metadata).unwrap()
}

/// Exported input files, as produced by the preprocessing pipeline.
pub struct ExportedInputs {
    pub dir: TempDir,
    pub embeddings: PathBuf,
    pub catalog: PathBuf,
}

impl ExportedInputs {
    pub fn write(fixtures: &[Fixture]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let embeddings = dir.path().join("embeddings.vec");
        let catalog = dir.path().join("catalog.json");

        let dimension = VectorDimension::new(fixtures[0].vector.len()).unwrap();
        let rows: Vec<&[f32]> = fixtures.iter().map(|f| f.vector.as_slice()).collect();
        EmbeddingMatrix::from_rows(dimension, &rows)
            .unwrap()
            .write_to(&embeddings)
            .expect("Failed to write embeddings");

        let (_, records) = store_and_catalog(fixtures);
        records
            .write(File::create(&catalog).expect("Failed to create catalog"))
            .expect("Failed to write catalog");

        Self {
            dir,
            embeddings,
            catalog,
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.path().join("index")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
