//! Error types for index persistence and the recommendation surface
//!
//! Component errors (`VectorError`, `ForestError`, `CatalogError`) live next
//! to their modules. This module adds the errors seen by callers: loading and
//! saving an index directory, and answering recommendation queries.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::forest::ForestError;
use crate::vector::{ReleaseId, VectorError};

/// Errors raised while building, saving, or loading an index directory
#[derive(Error, Debug)]
pub enum IndexError {
    /// File system errors
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Embedding error: {0}")]
    Vector(#[from] VectorError),

    #[error("Forest error: {0}")]
    Forest(#[from] ForestError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid index metadata in '{path}': {reason}")]
    Metadata { path: PathBuf, reason: String },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error("Index appears to be corrupted: {reason}")]
    IndexCorrupted { reason: String },

    #[error("No index found at '{path}'")]
    NotBuilt { path: PathBuf },
}

impl IndexError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON output
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::FileWrite { .. } => "FILE_WRITE_ERROR",
            Self::Vector(_) => "VECTOR_ERROR",
            Self::Forest(_) => "FOREST_ERROR",
            Self::Catalog(_) => "CATALOG_ERROR",
            Self::Metadata { .. } => "METADATA_ERROR",
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::IndexCorrupted { .. } => "INDEX_CORRUPTED",
            Self::NotBuilt { .. } => "INDEX_NOT_BUILT",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::NotBuilt { .. } => vec![
                "Run 'discogs-rec build <embeddings> <catalog>' to create the index",
                "Check 'index_path' in .discogs-rec/settings.toml",
            ],
            Self::IndexCorrupted { .. } | Self::Metadata { .. } => vec![
                "Run 'discogs-rec build --force' to rebuild from scratch",
                "Check for disk errors or filesystem corruption",
            ],
            Self::Forest(ForestError::Serialization(_) | ForestError::VersionMismatch { .. }) => {
                vec!["The forest file cannot be decoded, rebuild the index with this version"]
            }
            Self::Vector(VectorError::DimensionMismatch { .. })
            | Self::Forest(ForestError::DimensionMismatch { .. }) => vec![
                "Check 'build.expected_dimension' against the width of the embedding matrix",
                "Export embeddings and catalog from the same pipeline run",
            ],
            Self::Catalog(_) => vec![
                "The catalog must hold one record per embedding row, keyed by row index",
            ],
            Self::FileRead { .. } => vec![
                "Check that the file exists and you have read permissions",
                "Ensure the file is not locked by another process",
            ],
            Self::FileWrite { .. } => vec!["Check disk space and permissions in the index directory"],
            _ => vec![],
        }
    }
}

/// Errors returned to callers of the recommendation engine
#[derive(Error, Debug)]
pub enum RecommendError {
    #[error(
        "'{input}' is not a release identifier\nSuggestion: Use a release URL such as https://www.discogs.com/release/249504 or a numeric release id"
    )]
    MalformedIdentifier { input: String },

    #[error("Release {release_id} is not part of the index")]
    UnknownItem { release_id: ReleaseId },

    #[error("No recommendations found for release {release_id}")]
    NoRecommendations { release_id: ReleaseId },

    #[error("Search failed: {0}")]
    Search(#[from] ForestError),

    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),
}

impl RecommendError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> String {
        match self {
            Self::MalformedIdentifier { .. } => "MALFORMED_IDENTIFIER",
            Self::UnknownItem { .. } => "UNKNOWN_ITEM",
            Self::NoRecommendations { .. } => "NO_RECOMMENDATIONS",
            Self::Search(_) => "SEARCH_ERROR",
            Self::Catalog(_) => "CATALOG_ERROR",
        }
        .to_string()
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for recommendation queries
pub type RecommendResult<T> = Result<T, RecommendError>;
