//! Release recommendations over a random-projection forest.
//!
//! Embeddings produced by an upstream feature pipeline are indexed by a
//! forest of random hyperplane trees. Queries walk the forest to collect
//! approximate nearest neighbors by angular distance, and the recommendation
//! layer turns them into a short, artist-diverse list of releases.

pub mod catalog;
pub mod config;
pub mod display;
pub mod error;
pub mod forest;
pub mod io;
pub mod recommend;
pub mod storage;
pub mod vector;

// Explicit exports for better API clarity
pub use catalog::{CatalogError, MetadataCatalog, ReleaseRecord};
pub use config::Settings;
pub use error::{IndexError, IndexResult, RecommendError, RecommendResult};
pub use forest::{Forest, ForestBuilder, ForestError, ForestParams, Neighbor, SearchEngine};
pub use recommend::{RecommendConfig, RecommendationItem, Recommender, ReleaseQuery};
pub use storage::{IndexHandle, IndexMetadata, IndexPersistence, IndexSnapshot};
pub use vector::{EmbeddingMatrix, ItemIndex, ReleaseId, VectorDimension, VectorStore};
