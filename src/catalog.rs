//! Read-only release metadata, index-aligned with the vector store.
//!
//! The catalog file is a JSON object keyed by internal index:
//!
//! ```json
//! {
//!   "0": { "release_id": 1234, "artist_name": ["Orbital"], "release_title": "Snivilisation" },
//!   "1": { "release_id": 5678, "artist_name": "Aphex Twin", "release_title": "Drukqs",
//!          "label_name": "Warp Records", "have": 2031 }
//! }
//! ```
//!
//! Keys must cover `0..N` exactly. Fields the catalog does not interpret are
//! kept verbatim in [`ReleaseRecord::extra`].

use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::vector::{ItemIndex, ReleaseId, VectorStore};

/// Separator used when an artist credit lists several names.
pub const ARTIST_SEPARATOR: &str = " / ";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read or write catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}\nSuggestion: The catalog must be a JSON object keyed by internal index")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog has no record for index {0}\nSuggestion: Export one record per embedding row")]
    MissingIndex(usize),

    #[error("Release {0} appears more than once in the catalog")]
    DuplicateRelease(ReleaseId),

    #[error("Index {index} is outside the catalog (size {len})")]
    IndexOutOfRange { index: u32, len: usize },

    #[error(
        "Catalog and embeddings disagree at index {index}: catalog has release {catalog}, embeddings have {store}\nSuggestion: Export the catalog and embedding matrix from the same batch"
    )]
    Misaligned {
        index: usize,
        catalog: String,
        store: String,
    },
}

/// Descriptive attributes of one release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub release_id: ReleaseId,

    /// Artist credit; multiple artists are joined with `" / "`
    #[serde(deserialize_with = "deserialize_artist")]
    pub artist_name: String,

    pub release_title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,

    /// Pass-through fields (ratings, have/want counts, genres, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ReleaseRecord {
    /// Creates a record with only the required fields.
    pub fn new(
        release_id: ReleaseId,
        artist_name: impl Into<String>,
        release_title: impl Into<String>,
    ) -> Self {
        Self {
            release_id,
            artist_name: artist_name.into(),
            release_title: release_title.into(),
            label_name: None,
            country: None,
            release_year: None,
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label_name = Some(label.into());
        self
    }

    /// Artist name as compared by the diversity filter.
    #[must_use]
    pub fn normalized_artist(&self) -> String {
        self.artist_name.trim().to_lowercase()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtistCredit {
    Single(String),
    Multiple(Vec<String>),
}

fn deserialize_artist<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ArtistCredit::deserialize(deserializer)? {
        ArtistCredit::Single(name) => name,
        ArtistCredit::Multiple(names) => names.join(ARTIST_SEPARATOR),
    })
}

/// Index-aligned table of release records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataCatalog {
    records: Vec<ReleaseRecord>,
}

impl MetadataCatalog {
    /// Builds a catalog whose record `i` describes internal index `i`.
    pub fn from_records(records: Vec<ReleaseRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.release_id) {
                return Err(CatalogError::DuplicateRelease(record.release_id));
            }
        }
        Ok(Self { records })
    }

    /// Builds a catalog from an index-keyed map that must cover `0..len`.
    pub fn from_map(map: BTreeMap<usize, ReleaseRecord>) -> Result<Self, CatalogError> {
        let mut records = Vec::with_capacity(map.len());
        for (expected, (index, record)) in map.into_iter().enumerate() {
            if index != expected {
                return Err(CatalogError::MissingIndex(expected));
            }
            records.push(record);
        }
        Self::from_records(records)
    }

    /// Parses the JSON catalog format.
    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        let map: BTreeMap<usize, ReleaseRecord> = serde_json::from_reader(reader)?;
        Self::from_map(map)
    }

    /// Loads a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Writes the JSON catalog format.
    pub fn write(&self, writer: impl Write) -> Result<(), CatalogError> {
        let map: BTreeMap<usize, &ReleaseRecord> = self.records.iter().enumerate().collect();
        serde_json::to_writer_pretty(writer, &map)?;
        Ok(())
    }

    /// Attributes of an indexed item.
    pub fn attributes(&self, index: ItemIndex) -> Result<&ReleaseRecord, CatalogError> {
        self.records
            .get(index.as_usize())
            .ok_or(CatalogError::IndexOutOfRange {
                index: index.get(),
                len: self.records.len(),
            })
    }

    /// Checks that record `i` describes the same release as store row `i`.
    pub fn validate_against(&self, store: &VectorStore) -> Result<(), CatalogError> {
        if self.records.len() != store.len() {
            let index = self.records.len().min(store.len());
            return Err(CatalogError::Misaligned {
                index,
                catalog: self
                    .records
                    .get(index)
                    .map_or_else(|| "none".to_string(), |r| r.release_id.to_string()),
                store: store
                    .release_ids()
                    .get(index)
                    .map_or_else(|| "none".to_string(), ToString::to_string),
            });
        }
        for (index, (record, id)) in self.records.iter().zip(store.release_ids()).enumerate() {
            if record.release_id != *id {
                return Err(CatalogError::Misaligned {
                    index,
                    catalog: record.release_id.to_string(),
                    store: id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Release ids in index order, as expected by [`VectorStore::new`].
    #[must_use]
    pub fn release_ids(&self) -> Vec<ReleaseId> {
        self.records.iter().map(|r| r.release_id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorDimension;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "1": {
            "release_id": 5678,
            "artist_name": "Aphex Twin",
            "release_title": "Drukqs",
            "label_name": "Warp Records",
            "release_year": 2001,
            "have": 2031,
            "avg_rating": 4.5
        },
        "0": {
            "release_id": 1234,
            "artist_name": ["Autechre", "The Hafler Trio"],
            "release_title": "ae³o & h³ae"
        }
    }"#;

    fn rid(id: u64) -> ReleaseId {
        ReleaseId::new(id).unwrap()
    }

    #[test]
    fn test_parse_index_keyed_catalog() {
        let catalog = MetadataCatalog::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.release_ids(), vec![rid(1234), rid(5678)]);

        let first = catalog.attributes(ItemIndex::new(0)).unwrap();
        assert_eq!(first.artist_name, "Autechre / The Hafler Trio");
        assert_eq!(first.label_name, None);

        let second = catalog.attributes(ItemIndex::new(1)).unwrap();
        assert_eq!(second.label_name.as_deref(), Some("Warp Records"));
        assert_eq!(second.release_year, Some(2001));
        assert_eq!(second.extra["have"], serde_json::json!(2031));
        assert!(!second.extra.contains_key("label_name"));
    }

    #[test]
    fn test_attributes_out_of_range() {
        let catalog = MetadataCatalog::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(
            catalog.attributes(ItemIndex::new(2)),
            Err(CatalogError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_rejects_gaps_and_duplicates() {
        let gap = r#"{"0": {"release_id": 1, "artist_name": "A", "release_title": "x"},
                      "2": {"release_id": 2, "artist_name": "B", "release_title": "y"}}"#;
        assert!(matches!(
            MetadataCatalog::from_reader(gap.as_bytes()),
            Err(CatalogError::MissingIndex(1))
        ));

        let records = vec![
            ReleaseRecord::new(rid(9), "A", "x"),
            ReleaseRecord::new(rid(9), "B", "y"),
        ];
        assert!(matches!(
            MetadataCatalog::from_records(records),
            Err(CatalogError::DuplicateRelease(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let catalog = MetadataCatalog::from_reader(SAMPLE.as_bytes()).unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");

        catalog
            .write(std::fs::File::create(&path).unwrap())
            .unwrap();
        let loaded = MetadataCatalog::load(&path).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_validate_against_store() {
        let catalog = MetadataCatalog::from_reader(SAMPLE.as_bytes()).unwrap();
        let dim = VectorDimension::new(2).unwrap();

        let aligned = VectorStore::from_items(
            dim,
            vec![(rid(1234), vec![1.0, 0.0]), (rid(5678), vec![0.0, 1.0])],
        )
        .unwrap();
        assert!(catalog.validate_against(&aligned).is_ok());

        let swapped = VectorStore::from_items(
            dim,
            vec![(rid(5678), vec![1.0, 0.0]), (rid(1234), vec![0.0, 1.0])],
        )
        .unwrap();
        assert!(matches!(
            catalog.validate_against(&swapped),
            Err(CatalogError::Misaligned { index: 0, .. })
        ));
    }

    #[test]
    fn test_normalized_artist() {
        let record = ReleaseRecord::new(rid(1), "  The Orb ", "U.F.Orb");
        assert_eq!(record.normalized_artist(), "the orb");
    }
}
