//! Embedding storage for catalog items.
//!
//! Items arrive from the feature pipeline as a dense `N × D` matrix whose
//! row order defines the internal index. This module owns that matrix, the
//! bijection between internal indices and release ids, and the angular
//! distance used everywhere else in the crate.

mod distance;
mod store;
mod types;

// Re-export core types for public API
pub use distance::{
    angular_distance, angular_distance_with_norms, cosine_similarity, dot, margin, normalize,
    squared_norm,
};
pub use store::{EmbeddingMatrix, VectorStore};
pub use types::{ItemIndex, ReleaseId, VectorDimension, VectorError};
