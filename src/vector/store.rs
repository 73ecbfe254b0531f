//! Immutable embedding storage and the id ↔ index mapping.
//!
//! # File Format
//!
//! Embedding matrices are exchanged with the feature pipeline in a simple
//! binary format:
//! - Header (16 bytes): magic `DVEC`, version, dimension, row count
//! - Rows: contiguous f32 arrays in little-endian format, row-major
//!
//! Row order defines the internal index of each item.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::MmapOptions;

use crate::vector::distance::squared_norm;
use crate::vector::types::{ItemIndex, ReleaseId, VectorDimension, VectorError};

/// Current matrix file format version.
const MATRIX_VERSION: u32 = 1;

/// Size of the matrix header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify embedding matrix files.
const MAGIC_BYTES: &[u8; 4] = b"DVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Dense `N × D` matrix of embeddings in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    dimension: VectorDimension,
    rows: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Creates a matrix from a flat row-major buffer.
    pub fn new(dimension: VectorDimension, data: Vec<f32>) -> Result<Self, VectorError> {
        let trailing = data.len() % dimension.get();
        if trailing != 0 {
            return Err(VectorError::InvalidFormat(format!(
                "{} values do not form whole rows of width {}, {trailing} left over",
                data.len(),
                dimension.get()
            )));
        }
        let rows = data.len() / dimension.get();
        Ok(Self {
            dimension,
            rows,
            data,
        })
    }

    /// Creates a matrix from individual rows, validating every row width.
    pub fn from_rows<R: AsRef<[f32]>>(
        dimension: VectorDimension,
        rows: &[R],
    ) -> Result<Self, VectorError> {
        let mut data = Vec::with_capacity(rows.len() * dimension.get());
        for row in rows {
            let row = row.as_ref();
            dimension.validate_vector(row)?;
            data.extend_from_slice(row);
        }
        Ok(Self {
            dimension,
            rows: rows.len(),
            data,
        })
    }

    /// Returns the row at `index`, if present.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let dim = self.dimension.get();
        Some(&self.data[index * dim..(index + 1) * dim])
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Width of every row.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Writes the matrix in the `DVEC` format.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), VectorError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Streams the matrix in the `DVEC` format into any writer.
    pub fn write(&self, writer: &mut impl Write) -> Result<(), VectorError> {
        let dimension = u32::try_from(self.dimension.get())
            .map_err(|_| VectorError::TooManyItems(self.dimension.get()))?;
        let rows = u32::try_from(self.rows).map_err(|_| VectorError::TooManyItems(self.rows))?;

        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&MATRIX_VERSION.to_le_bytes())?;
        writer.write_all(&dimension.to_le_bytes())?;
        writer.write_all(&rows.to_le_bytes())?;

        for &value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Opens a `DVEC` file through a read-only memory map.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VectorError> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Self::from_bytes(&mmap)
    }

    /// Decodes a `DVEC` buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VectorError> {
        if bytes.len() < HEADER_SIZE {
            return Err(VectorError::InvalidFormat(
                "File too small to contain header".to_string(),
            ));
        }

        if &bytes[0..4] != MAGIC_BYTES {
            return Err(VectorError::InvalidFormat(
                "Invalid magic bytes".to_string(),
            ));
        }

        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != MATRIX_VERSION {
            return Err(VectorError::VersionMismatch {
                expected: MATRIX_VERSION,
                actual: version,
            });
        }

        let dim_value = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let dimension = VectorDimension::new(dim_value as usize)?;
        let rows = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;

        let expected_len = rows
            .checked_mul(dimension.get())
            .and_then(|values| values.checked_mul(BYTES_PER_F32))
            .and_then(|payload| payload.checked_add(HEADER_SIZE))
            .ok_or_else(|| {
                VectorError::InvalidFormat(format!(
                    "Header declares an impossible size: {rows} rows of dimension {}",
                    dimension.get()
                ))
            })?;
        if bytes.len() != expected_len {
            return Err(VectorError::InvalidFormat(format!(
                "Expected {expected_len} bytes for {rows} rows of dimension {}, found {}",
                dimension.get(),
                bytes.len()
            )));
        }

        let data = bytes[HEADER_SIZE..]
            .chunks_exact(BYTES_PER_F32)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Self::new(dimension, data)
    }
}

/// Immutable array of item embeddings plus the release id mapping.
///
/// Internal index ↔ release id is a bijection; construction rejects
/// duplicate ids and any disagreement between the number of rows and ids.
#[derive(Debug, Clone)]
pub struct VectorStore {
    matrix: EmbeddingMatrix,

    /// Squared norms per row, cached for distance computations
    squared_norms: Vec<f64>,

    /// Release id per internal index
    ids: Vec<ReleaseId>,

    /// Reverse lookup from release id to internal index
    index_of: HashMap<ReleaseId, ItemIndex>,
}

impl VectorStore {
    /// Creates a store from a matrix and the release id of every row.
    pub fn new(matrix: EmbeddingMatrix, ids: Vec<ReleaseId>) -> Result<Self, VectorError> {
        if matrix.rows() != ids.len() {
            return Err(VectorError::CountMismatch {
                vectors: matrix.rows(),
                ids: ids.len(),
            });
        }
        if u32::try_from(ids.len()).is_err() {
            return Err(VectorError::TooManyItems(ids.len()));
        }

        let mut index_of = HashMap::with_capacity(ids.len());
        for (position, id) in ids.iter().enumerate() {
            // Bounded by the u32 check above
            let index = ItemIndex::new(position as u32);
            if index_of.insert(*id, index).is_some() {
                return Err(VectorError::DuplicateItem { id: *id });
            }
        }

        let squared_norms = (0..matrix.rows())
            .filter_map(|row| matrix.row(row))
            .map(squared_norm)
            .collect();

        Ok(Self {
            matrix,
            squared_norms,
            ids,
            index_of,
        })
    }

    /// Creates a store from `(release id, vector)` pairs.
    ///
    /// Fails with `DimensionMismatch` if any vector's length differs from
    /// `dimension`.
    pub fn from_items(
        dimension: VectorDimension,
        items: Vec<(ReleaseId, Vec<f32>)>,
    ) -> Result<Self, VectorError> {
        let (ids, rows): (Vec<ReleaseId>, Vec<Vec<f32>>) = items.into_iter().unzip();
        let matrix = EmbeddingMatrix::from_rows(dimension, &rows)?;
        Self::new(matrix, ids)
    }

    /// Returns the embedding of an item in O(1).
    #[must_use]
    pub fn vector(&self, index: ItemIndex) -> Option<&[f32]> {
        self.matrix.row(index.as_usize())
    }

    /// Returns the cached squared norm of an item.
    #[must_use]
    pub fn squared_norm(&self, index: ItemIndex) -> Option<f64> {
        self.squared_norms.get(index.as_usize()).copied()
    }

    /// Maps an internal index to its release id.
    #[must_use]
    pub fn release_id(&self, index: ItemIndex) -> Option<ReleaseId> {
        self.ids.get(index.as_usize()).copied()
    }

    /// Maps a release id to its internal index.
    #[must_use]
    pub fn index_of(&self, id: ReleaseId) -> Option<ItemIndex> {
        self.index_of.get(&id).copied()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the store holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension shared by all items.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.matrix.dimension()
    }

    /// The underlying matrix, for persistence.
    #[must_use]
    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    /// Release ids in internal index order.
    #[must_use]
    pub fn release_ids(&self) -> &[ReleaseId] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rid(id: u64) -> ReleaseId {
        ReleaseId::new(id).unwrap()
    }

    #[test]
    fn test_store_lookup_both_ways() {
        let dim = VectorDimension::new(2).unwrap();
        let store = VectorStore::from_items(
            dim,
            vec![
                (rid(10), vec![1.0, 0.0]),
                (rid(20), vec![0.0, 1.0]),
                (rid(30), vec![1.0, 1.0]),
            ],
        )
        .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.index_of(rid(20)), Some(ItemIndex::new(1)));
        assert_eq!(store.release_id(ItemIndex::new(2)), Some(rid(30)));
        assert_eq!(store.vector(ItemIndex::new(1)), Some(&[0.0, 1.0][..]));
        assert_eq!(store.squared_norm(ItemIndex::new(2)), Some(2.0));

        assert!(store.index_of(rid(99)).is_none());
        assert!(store.vector(ItemIndex::new(3)).is_none());
    }

    #[test]
    fn test_store_rejects_wrong_dimension() {
        let dim = VectorDimension::new(3).unwrap();
        let result = VectorStore::from_items(
            dim,
            vec![(rid(1), vec![1.0, 2.0, 3.0]), (rid(2), vec![1.0, 2.0])],
        );
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_matrix_rejects_partial_row() {
        let dim = VectorDimension::new(3).unwrap();
        assert_eq!(
            EmbeddingMatrix::new(dim, vec![0.0; 6]).unwrap().rows(),
            2
        );
        match EmbeddingMatrix::new(dim, vec![0.0; 7]) {
            Err(VectorError::InvalidFormat(msg)) => assert!(msg.contains("1 left over")),
            other => panic!("Expected invalid format, got {other:?}"),
        }
    }

    #[test]
    fn test_store_rejects_duplicate_ids() {
        let dim = VectorDimension::new(1).unwrap();
        let result =
            VectorStore::from_items(dim, vec![(rid(5), vec![1.0]), (rid(5), vec![2.0])]);
        assert!(matches!(result, Err(VectorError::DuplicateItem { .. })));
    }

    #[test]
    fn test_store_rejects_count_mismatch() {
        let dim = VectorDimension::new(1).unwrap();
        let matrix = EmbeddingMatrix::from_rows(dim, &[vec![1.0], vec![2.0]]).unwrap();
        let result = VectorStore::new(matrix, vec![rid(1)]);
        assert!(matches!(
            result,
            Err(VectorError::CountMismatch { vectors: 2, ids: 1 })
        ));
    }

    #[test]
    fn test_matrix_file_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("embeddings.vec");
        let dim = VectorDimension::new(3).unwrap();
        let matrix =
            EmbeddingMatrix::from_rows(dim, &[vec![1.0, 2.0, 3.0], vec![-4.5, 0.25, 6.0]])
                .unwrap();

        matrix.write_to(&path).unwrap();
        let loaded = EmbeddingMatrix::open(&path).unwrap();

        assert_eq!(loaded, matrix);
        assert_eq!(loaded.row(1), Some(&[-4.5, 0.25, 6.0][..]));
    }

    #[test]
    fn test_matrix_rejects_truncated_file() {
        let dim = VectorDimension::new(2).unwrap();
        let matrix = EmbeddingMatrix::from_rows(dim, &[vec![1.0, 2.0]]).unwrap();
        let mut bytes = Vec::new();
        matrix.write(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 1);

        assert!(matches!(
            EmbeddingMatrix::from_bytes(&bytes),
            Err(VectorError::InvalidFormat(_))
        ));
        assert!(matches!(
            EmbeddingMatrix::from_bytes(b"XXXX"),
            Err(VectorError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_matrix_rejects_future_version() {
        let dim = VectorDimension::new(1).unwrap();
        let matrix = EmbeddingMatrix::from_rows(dim, &[vec![1.0]]).unwrap();
        let mut bytes = Vec::new();
        matrix.write(&mut bytes).unwrap();
        bytes[4..8].copy_from_slice(&9u32.to_le_bytes());

        assert!(matches!(
            EmbeddingMatrix::from_bytes(&bytes),
            Err(VectorError::VersionMismatch {
                expected: 1,
                actual: 9
            })
        ));
    }
}
