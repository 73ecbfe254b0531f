//! Shared, atomically replaceable index state.
//!
//! An [`IndexSnapshot`] bundles everything a query needs and is never
//! mutated after construction. [`IndexHandle`] publishes the current snapshot
//! through an `ArcSwap`: readers take an `Arc` and keep using it for as long
//! as they like, while a reload swaps in a new snapshot without blocking
//! them. The old snapshot is freed when its last reader drops it.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::catalog::MetadataCatalog;
use crate::error::{IndexError, IndexResult};
use crate::forest::{Forest, ForestError, SearchEngine};
use crate::storage::{IndexMetadata, IndexPersistence};
use crate::vector::VectorStore;

/// Immutable, mutually consistent index state.
#[derive(Debug)]
pub struct IndexSnapshot {
    store: VectorStore,
    forest: Forest,
    catalog: MetadataCatalog,
    metadata: IndexMetadata,
}

impl IndexSnapshot {
    /// Bundles the parts of an index, checking that they describe the same items.
    pub fn new(
        store: VectorStore,
        forest: Forest,
        catalog: MetadataCatalog,
        metadata: IndexMetadata,
    ) -> IndexResult<Self> {
        forest
            .validate_against(&store)
            .map_err(|e| IndexError::IndexCorrupted {
                reason: format!("forest does not match embeddings: {e}"),
            })?;
        catalog
            .validate_against(&store)
            .map_err(|e| IndexError::IndexCorrupted {
                reason: format!("catalog does not match embeddings: {e}"),
            })?;
        if metadata.item_count != store.len() || metadata.dimension != store.dimension().get() {
            return Err(IndexError::IndexCorrupted {
                reason: format!(
                    "metadata describes {} items of dimension {}, embeddings hold {} of dimension {}",
                    metadata.item_count,
                    metadata.dimension,
                    store.len(),
                    store.dimension().get()
                ),
            });
        }

        Ok(Self {
            store,
            forest,
            catalog,
            metadata,
        })
    }

    #[must_use]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    #[must_use]
    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// A search engine borrowing this snapshot.
    pub fn search_engine(&self, candidate_slack: usize) -> Result<SearchEngine<'_>, ForestError> {
        Ok(SearchEngine::new(&self.forest, &self.store)?.with_candidate_slack(candidate_slack))
    }
}

/// Handle to the index currently being served.
#[derive(Debug)]
pub struct IndexHandle {
    current: ArcSwap<IndexSnapshot>,
}

impl IndexHandle {
    pub fn new(snapshot: IndexSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot to run a query against.
    #[inline]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.load_full()
    }

    /// Publishes `snapshot` and returns the one it replaced.
    pub fn replace(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let previous = self.current.swap(Arc::new(snapshot));
        info!(
            items = self.current.load().store.len(),
            previous_items = previous.store.len(),
            "Index snapshot replaced"
        );
        previous
    }

    /// Loads the index from disk and publishes it.
    ///
    /// On failure the current snapshot stays in place.
    pub fn reload(&self, persistence: &IndexPersistence) -> IndexResult<Arc<IndexSnapshot>> {
        let snapshot = persistence.load()?;
        Ok(self.replace(snapshot))
    }
}
