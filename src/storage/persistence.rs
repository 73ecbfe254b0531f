//! On-disk layout of a built index
//!
//! An index directory holds four files:
//! - `embeddings.vec`: the embedding matrix
//! - `forest.ann`: the encoded forest
//! - `catalog.json`: release metadata keyed by internal index
//! - `metadata.json`: build parameters, written last
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! failed save never leaves a truncated file behind. `metadata.json` records
//! the SHA-256 of the other three files and is renamed in last: a save that
//! stops halfway leaves digests that no longer match, and `load` reports the
//! directory as corrupted instead of mixing files from two builds.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::catalog::MetadataCatalog;
use crate::error::{IndexError, IndexResult};
use crate::forest::codec;
use crate::storage::metadata::METADATA_FILE;
use crate::storage::{IndexMetadata, IndexSnapshot};
use crate::vector::{EmbeddingMatrix, VectorStore};

const EMBEDDINGS_FILE: &str = "embeddings.vec";
const FOREST_FILE: &str = "forest.ann";
const CATALOG_FILE: &str = "catalog.json";

/// Manages persistence of the index
#[derive(Debug, Clone)]
pub struct IndexPersistence {
    base_path: PathBuf,
}

impl IndexPersistence {
    /// Create a new persistence manager
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.base_path.join(EMBEDDINGS_FILE)
    }

    pub fn forest_path(&self) -> PathBuf {
        self.base_path.join(FOREST_FILE)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.base_path.join(CATALOG_FILE)
    }

    /// Save every part of `snapshot`
    #[must_use = "Save errors should be handled to ensure data is persisted"]
    pub fn save(&self, snapshot: &IndexSnapshot) -> IndexResult<()> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.base_path).map_err(|e| IndexError::FileWrite {
            path: self.base_path.clone(),
            source: e,
        })?;

        let mut metadata = snapshot.metadata().clone();
        metadata.files.clear();

        let digest = self.write_atomic(&self.embeddings_path(), |writer| {
            snapshot.store().matrix().write(writer)?;
            Ok(())
        })?;
        metadata.files.insert(EMBEDDINGS_FILE.to_string(), digest);

        let digest = self.write_atomic(&self.forest_path(), |writer| {
            codec::encode(snapshot.forest(), writer)?;
            Ok(())
        })?;
        metadata.files.insert(FOREST_FILE.to_string(), digest);

        let digest = self.write_atomic(&self.catalog_path(), |writer| {
            snapshot.catalog().write(&mut *writer)?;
            Ok(())
        })?;
        metadata.files.insert(CATALOG_FILE.to_string(), digest);

        let json = metadata.to_json()?;
        self.write_atomic(&self.base_path.join(METADATA_FILE), |writer| {
            writer
                .write_all(json.as_bytes())
                .map_err(|e| IndexError::FileWrite {
                    path: METADATA_FILE.into(),
                    source: e,
                })
        })?;

        info!(
            path = %self.base_path.display(),
            items = snapshot.store().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Index saved"
        );
        Ok(())
    }

    /// Load and cross-check a saved index
    #[must_use = "Load errors should be handled appropriately"]
    pub fn load(&self) -> IndexResult<IndexSnapshot> {
        if !self.exists() {
            return Err(IndexError::NotBuilt {
                path: self.base_path.clone(),
            });
        }
        let start = Instant::now();

        let metadata = IndexMetadata::load(&self.base_path)?;
        for file in [EMBEDDINGS_FILE, FOREST_FILE, CATALOG_FILE] {
            self.verify_digest(&metadata, file)?;
        }
        let matrix = EmbeddingMatrix::open(self.embeddings_path())?;
        let catalog = MetadataCatalog::load(self.catalog_path())?;
        debug!(
            rows = matrix.rows(),
            records = catalog.len(),
            "Loaded embeddings and catalog"
        );

        let store = VectorStore::new(matrix, catalog.release_ids()).map_err(|e| {
            IndexError::IndexCorrupted {
                reason: format!("catalog does not match embeddings: {e}"),
            }
        })?;
        let forest = codec::load(self.forest_path())?;
        let snapshot = IndexSnapshot::new(store, forest, catalog, metadata)?;

        info!(
            path = %self.base_path.display(),
            items = snapshot.store().len(),
            trees = snapshot.forest().tree_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Index loaded"
        );
        Ok(snapshot)
    }

    /// Check if a complete index exists
    pub fn exists(&self) -> bool {
        IndexMetadata::exists(&self.base_path)
            && self.embeddings_path().exists()
            && self.forest_path().exists()
            && self.catalog_path().exists()
    }

    /// Delete the persisted index
    pub fn clear(&self) -> Result<(), std::io::Error> {
        if self.base_path.exists() {
            std::fs::remove_dir_all(&self.base_path)?;
        }
        Ok(())
    }

    /// Check a data file against the digest recorded by the last complete save
    fn verify_digest(&self, metadata: &IndexMetadata, file: &str) -> IndexResult<()> {
        let expected = metadata
            .files
            .get(file)
            .ok_or_else(|| IndexError::IndexCorrupted {
                reason: format!("{METADATA_FILE} has no digest for {file}"),
            })?;
        let path = self.base_path.join(file);
        let actual = file_digest(&path).map_err(|e| IndexError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        if &actual != expected {
            return Err(IndexError::IndexCorrupted {
                reason: format!(
                    "{file} does not match the build recorded in {METADATA_FILE} \
                     (interrupted save?)"
                ),
            });
        }
        Ok(())
    }

    /// Writes through a temporary sibling and returns the SHA-256 of the content
    fn write_atomic<F>(&self, path: &Path, write: F) -> IndexResult<String>
    where
        F: FnOnce(&mut BufWriter<&mut File>) -> IndexResult<()>,
    {
        let write_error = |source| IndexError::FileWrite {
            path: path.to_path_buf(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.base_path).map_err(write_error)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write(&mut writer)?;
            writer.flush().map_err(write_error)?;
        }
        temp.as_file().sync_all().map_err(write_error)?;
        let digest = file_digest(temp.path()).map_err(write_error)?;
        temp.persist(path).map_err(|e| write_error(e.error))?;
        Ok(digest)
    }
}

/// Hex SHA-256 of a file's content
fn file_digest(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
