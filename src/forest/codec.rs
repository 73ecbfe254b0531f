//! Binary forest serialization.
//!
//! # File Format
//!
//! All integers are little-endian `u32`, all floats little-endian `f32`.
//! - Header (24 bytes): magic `DFST`, version, item count `N`, dimension `D`,
//!   tree count `T`, leaf capacity `K`
//! - Per tree: node count, then nodes in pre-order
//! - Split node: tag `0`, left, right, offset, `D` normal components
//! - Leaf node: tag `1`, item count, item indices
//!
//! Decoding is strict: a truncated buffer, an unknown tag, a dangling child,
//! an item outside `[0, N)`, or bytes left over after the last tree all fail.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::MmapOptions;

use crate::forest::{Forest, ForestError, Node, Tree};
use crate::vector::{ItemIndex, VectorDimension, VectorStore};

/// Current forest file format version.
pub const FOREST_VERSION: u32 = 1;

/// Magic bytes to identify forest files.
const MAGIC_BYTES: &[u8; 4] = b"DFST";

/// Size of the forest header in bytes.
const HEADER_SIZE: usize = 24;

const TAG_SPLIT: u32 = 0;
const TAG_LEAF: u32 = 1;

/// Smallest possible encoded node: an empty leaf.
const MIN_NODE_SIZE: usize = 8;

fn to_u32(value: usize, what: &str) -> Result<u32, ForestError> {
    u32::try_from(value)
        .map_err(|_| ForestError::Serialization(format!("{what} {value} does not fit in u32")))
}

/// Writes `forest` to any writer.
pub fn encode(forest: &Forest, writer: &mut impl Write) -> Result<(), ForestError> {
    writer.write_all(MAGIC_BYTES)?;
    writer.write_all(&FOREST_VERSION.to_le_bytes())?;
    for (value, what) in [
        (forest.item_count(), "item count"),
        (forest.dimension().get(), "dimension"),
        (forest.tree_count(), "tree count"),
        (forest.leaf_capacity(), "leaf capacity"),
    ] {
        writer.write_all(&to_u32(value, what)?.to_le_bytes())?;
    }

    for tree in forest.trees() {
        writer.write_all(&to_u32(tree.len(), "node count")?.to_le_bytes())?;
        for node in tree.nodes() {
            match node {
                Node::Split {
                    normal,
                    offset,
                    left,
                    right,
                } => {
                    writer.write_all(&TAG_SPLIT.to_le_bytes())?;
                    writer.write_all(&left.to_le_bytes())?;
                    writer.write_all(&right.to_le_bytes())?;
                    writer.write_all(&offset.to_le_bytes())?;
                    for component in normal.iter() {
                        writer.write_all(&component.to_le_bytes())?;
                    }
                }
                Node::Leaf { items } => {
                    writer.write_all(&TAG_LEAF.to_le_bytes())?;
                    writer.write_all(&to_u32(items.len(), "leaf size")?.to_le_bytes())?;
                    for item in items {
                        writer.write_all(&item.to_bytes())?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Encodes `forest` into a fresh buffer.
pub fn encode_to_vec(forest: &Forest) -> Result<Vec<u8>, ForestError> {
    let mut buffer = Vec::new();
    encode(forest, &mut buffer)?;
    Ok(buffer)
}

/// Writes `forest` to `path`, replacing any existing file.
pub fn save(forest: &Forest, path: impl AsRef<Path>) -> Result<(), ForestError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode(forest, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads a forest file through a read-only memory map.
pub fn load(path: impl AsRef<Path>) -> Result<Forest, ForestError> {
    let file = File::open(path.as_ref())?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    decode(&mmap)
}

/// Decodes a forest and checks that it belongs to `store`.
pub fn decode_paired(bytes: &[u8], store: &VectorStore) -> Result<Forest, ForestError> {
    let forest = decode(bytes)?;
    forest.validate_against(store)?;
    Ok(forest)
}

/// Decodes a forest buffer.
pub fn decode(bytes: &[u8]) -> Result<Forest, ForestError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ForestError::Serialization(
            "File too small to contain header".to_string(),
        ));
    }
    if &bytes[0..4] != MAGIC_BYTES {
        return Err(ForestError::Serialization(
            "Invalid magic bytes".to_string(),
        ));
    }

    let mut reader = ByteReader::new(&bytes[4..]);
    let version = reader.read_u32()?;
    if version != FOREST_VERSION {
        return Err(ForestError::VersionMismatch {
            expected: FOREST_VERSION,
            actual: version,
        });
    }

    let item_count = reader.read_u32()? as usize;
    let dimension = VectorDimension::new(reader.read_u32()? as usize)
        .map_err(|e| ForestError::Serialization(e.to_string()))?;
    let tree_count = reader.read_u32()? as usize;
    let leaf_capacity = reader.read_u32()? as usize;

    let mut trees = Vec::with_capacity(tree_count.min(reader.remaining() / 4));
    for tree in 0..tree_count {
        let node_count = reader.read_u32()? as usize;
        if node_count > reader.remaining() / MIN_NODE_SIZE {
            return Err(ForestError::Serialization(format!(
                "tree {tree} declares {node_count} nodes but only {} bytes remain",
                reader.remaining()
            )));
        }

        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            nodes.push(read_node(&mut reader, dimension)?);
        }
        trees.push(Tree::from_nodes(nodes));
    }

    if reader.remaining() != 0 {
        return Err(ForestError::Serialization(format!(
            "{} trailing bytes after the last tree",
            reader.remaining()
        )));
    }

    // Anything the structural check rejects came from the bytes on disk
    Forest::from_parts(dimension, item_count, leaf_capacity, trees).map_err(|e| match e {
        ForestError::InvalidStructure(msg) => ForestError::Serialization(msg),
        other => ForestError::Serialization(format!("invalid forest file: {other}")),
    })
}

fn read_node(reader: &mut ByteReader<'_>, dimension: VectorDimension) -> Result<Node, ForestError> {
    match reader.read_u32()? {
        TAG_SPLIT => {
            let left = reader.read_u32()?;
            let right = reader.read_u32()?;
            let offset = reader.read_f32()?;
            let normal = (0..dimension.get())
                .map(|_| reader.read_f32())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Split {
                normal: normal.into_boxed_slice(),
                offset,
                left,
                right,
            })
        }
        TAG_LEAF => {
            let count = reader.read_u32()? as usize;
            if count > reader.remaining() / 4 {
                return Err(ForestError::Serialization(format!(
                    "leaf declares {count} items but only {} bytes remain",
                    reader.remaining()
                )));
            }
            let items = (0..count)
                .map(|_| reader.read_u32().map(ItemIndex::new))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Leaf { items })
        }
        tag => Err(ForestError::Serialization(format!("unknown node tag {tag}"))),
    }
}

/// Sequential little-endian reader over a byte slice.
struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn read_word(&mut self) -> Result<[u8; 4], ForestError> {
        let word = self
            .bytes
            .get(self.position..self.position + 4)
            .ok_or_else(|| ForestError::Serialization("unexpected end of data".to_string()))?;
        self.position += 4;
        Ok([word[0], word[1], word[2], word[3]])
    }

    fn read_u32(&mut self) -> Result<u32, ForestError> {
        self.read_word().map(u32::from_le_bytes)
    }

    fn read_f32(&mut self) -> Result<f32, ForestError> {
        self.read_word().map(f32::from_le_bytes)
    }
}
