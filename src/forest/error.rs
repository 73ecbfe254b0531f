//! Errors raised while building, encoding, or searching a forest.

use thiserror::Error;

use crate::vector::VectorError;

/// Errors that can occur during forest operations.
#[derive(Error, Debug)]
pub enum ForestError {
    #[error(
        "Cannot build a forest from an empty dataset\nSuggestion: Check that the embedding matrix contains at least one row"
    )]
    EmptyDataset,

    #[error("Invalid leaf capacity: {0}\nSuggestion: Use a leaf capacity of at least 1")]
    InvalidLeafCapacity(usize),

    #[error("Invalid tree count: {0}\nSuggestion: Build at least one tree")]
    InvalidTreeCount(usize),

    #[error("The forest contains no trees\nSuggestion: Rebuild the index with a positive tree count")]
    EmptyIndex,

    #[error(
        "Dimension mismatch: forest expects {expected}, got {actual}\nSuggestion: Rebuild the forest from the embeddings it is served with"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Item count mismatch: forest indexes {expected} items, store holds {actual}\nSuggestion: Rebuild the forest from the embeddings it is served with"
    )]
    ItemCountMismatch { expected: usize, actual: usize },

    #[error("Item {0} is not part of the index")]
    ItemOutOfRange(u32),

    #[error("Invalid forest structure: {0}")]
    InvalidStructure(String),

    #[error(
        "Forest serialization error: {0}\nSuggestion: The forest file may be truncated or corrupted. Rebuild the index."
    )]
    Serialization(String),

    #[error(
        "Invalid forest version: expected {expected}, got {actual}\nSuggestion: Rebuild the index with this version"
    )]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Failed to start build threads: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VectorError> for ForestError {
    fn from(error: VectorError) -> Self {
        match error {
            VectorError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            VectorError::Storage(io) => Self::Io(io),
            other => Self::InvalidStructure(other.to_string()),
        }
    }
}
