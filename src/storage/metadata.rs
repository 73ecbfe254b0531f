//! Metadata describing a built index directory

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::forest::{Forest, ForestParams};

/// File name of the metadata sidecar inside an index directory
pub const METADATA_FILE: &str = "metadata.json";

/// Metadata about a built index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Version of the index layout
    pub version: u32,

    /// Number of indexed releases (`N`)
    pub item_count: usize,

    /// Embedding width (`D`)
    pub dimension: usize,

    /// Parameters the forest was built with
    pub params: ForestParams,

    /// Seed of a reproducible build, absent for entropy-seeded builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Wall time of the build in milliseconds
    pub build_millis: u64,

    /// Unix timestamp of the build
    pub created_at: i64,

    /// SHA-256 of every data file, keyed by file name, recorded at save time
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
}

impl IndexMetadata {
    /// Current layout version
    pub const CURRENT_VERSION: u32 = 1;

    /// Describes a freshly built forest
    pub fn for_forest(forest: &Forest, seed: Option<u64>, build_millis: u64) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            item_count: forest.item_count(),
            dimension: forest.dimension().get(),
            params: ForestParams {
                tree_count: forest.tree_count(),
                leaf_capacity: forest.leaf_capacity(),
            },
            seed,
            build_millis,
            created_at: chrono::Utc::now().timestamp(),
            files: BTreeMap::new(),
        }
    }

    /// Build time formatted for display
    pub fn created_at_display(&self) -> String {
        chrono::DateTime::from_timestamp(self.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| self.created_at.to_string())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> IndexResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| IndexError::Metadata {
            path: METADATA_FILE.into(),
            reason: format!("Failed to serialize metadata: {e}"),
        })
    }

    /// Load metadata from an index directory
    pub fn load(base_path: &Path) -> IndexResult<Self> {
        let metadata_path = base_path.join(METADATA_FILE);

        let json = fs::read_to_string(&metadata_path).map_err(|e| IndexError::FileRead {
            path: metadata_path.clone(),
            source: e,
        })?;

        let metadata: Self = serde_json::from_str(&json).map_err(|e| IndexError::Metadata {
            path: metadata_path.clone(),
            reason: format!("Failed to parse metadata: {e}"),
        })?;

        if metadata.version > Self::CURRENT_VERSION {
            return Err(IndexError::Metadata {
                path: metadata_path,
                reason: format!(
                    "Metadata version {} is newer than supported version {}",
                    metadata.version,
                    Self::CURRENT_VERSION
                ),
            });
        }

        Ok(metadata)
    }

    /// Check if a metadata file exists
    pub fn exists(base_path: &Path) -> bool {
        base_path.join(METADATA_FILE).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::Tree;
    use crate::forest::Node;
    use crate::vector::{ItemIndex, VectorDimension};
    use tempfile::TempDir;

    fn forest() -> Forest {
        let tree = Tree::from_nodes(vec![Node::Leaf {
            items: vec![ItemIndex::new(0), ItemIndex::new(1)],
        }]);
        Forest::from_parts(VectorDimension::new(3).unwrap(), 2, 4, vec![tree]).unwrap()
    }

    #[test]
    fn test_metadata_describes_forest() {
        let metadata = IndexMetadata::for_forest(&forest(), Some(7), 12);
        assert_eq!(metadata.item_count, 2);
        assert_eq!(metadata.dimension, 3);
        assert_eq!(metadata.params.tree_count, 1);
        assert_eq!(metadata.params.leaf_capacity, 4);
        assert_eq!(metadata.seed, Some(7));
        assert!(metadata.created_at_display().ends_with("UTC"));
    }

    #[test]
    fn test_metadata_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!IndexMetadata::exists(temp_dir.path()));

        let metadata = IndexMetadata::for_forest(&forest(), None, 3);
        fs::write(temp_dir.path().join(METADATA_FILE), metadata.to_json().unwrap()).unwrap();

        assert!(IndexMetadata::exists(temp_dir.path()));
        let loaded = IndexMetadata::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, metadata);
    }

    #[test]
    fn test_version_compatibility() {
        let temp_dir = TempDir::new().unwrap();
        let future = r#"{
            "version": 999,
            "item_count": 1,
            "dimension": 2,
            "params": { "tree_count": 1, "leaf_capacity": 1 },
            "build_millis": 0,
            "created_at": 1735689600
        }"#;
        fs::write(temp_dir.path().join(METADATA_FILE), future).unwrap();

        match IndexMetadata::load(temp_dir.path()) {
            Err(IndexError::Metadata { reason, .. }) => assert!(reason.contains("version")),
            other => panic!("Expected version error, got {other:?}"),
        }
    }
}
