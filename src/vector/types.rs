//! Type-safe wrappers and core types for the embedding layer.
//!
//! Internal indices and external release ids are both integers in the source
//! data; keeping them as distinct newtypes makes it impossible to hand a
//! catalog id to the forest or the other way round.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use thiserror::Error;

/// Dense, 0-based position of an item in the vector store and forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIndex(u32);

impl ItemIndex {
    /// Creates a new `ItemIndex`.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Creates an index from a `usize` position.
    ///
    /// Returns `None` when the position does not fit the on-disk `u32` width.
    #[must_use]
    pub fn from_usize(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize` for slice access.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Converts to little-endian bytes for storage.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Creates from little-endian bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl std::fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable external identifier of a catalog release.
///
/// Discogs release ids start at 1, so zero is rejected the same way the
/// vector ids of the storage layer reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(NonZeroU64);

impl ReleaseId {
    /// Creates a new `ReleaseId` from a non-zero u64.
    ///
    /// Returns `None` if the provided id is zero.
    #[must_use]
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    /// Returns the underlying u64 value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for vector dimensions.
///
/// Every vector in one store and one forest shares the same dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl TryFrom<usize> for VectorDimension {
    type Error = VectorError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VectorDimension> for usize {
    fn from(value: VectorDimension) -> Self {
        value.0
    }
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors come from the same dimensionality reduction run"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error(
        "Release {id} appears more than once\nSuggestion: Deduplicate releases before exporting embeddings"
    )]
    DuplicateItem { id: ReleaseId },

    #[error(
        "Item count mismatch: {vectors} vectors but {ids} release ids\nSuggestion: Export the embedding matrix and the catalog from the same cleaned dataset"
    )]
    CountMismatch { vectors: usize, ids: usize },

    #[error("Too many items: {0}\nSuggestion: Item indices are stored as u32; split the catalog")]
    TooManyItems(usize),

    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Storage(#[from] std::io::Error),

    #[error(
        "Invalid embedding file: {0}\nSuggestion: Re-export the embedding matrix from the feature pipeline"
    )]
    InvalidFormat(String),

    #[error(
        "Invalid storage version: expected {expected}, got {actual}\nSuggestion: Re-export the embedding matrix with a compatible version"
    )]
    VersionMismatch { expected: u32, actual: u32 },
}
