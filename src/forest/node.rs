//! Forest data model: split and leaf nodes, trees, and the forest itself.
//!
//! Each tree stores its nodes in a flat arena in pre-order. The root is
//! node 0 and every split node refers to its children by arena position,
//! always greater than its own, so trees cannot contain cycles.

use serde::{Deserialize, Serialize};

use crate::forest::ForestError;
use crate::vector::{ItemIndex, VectorDimension, VectorStore};

/// Build parameters shared by every tree of a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of independently built trees (`T`)
    pub tree_count: usize,

    /// Maximum number of items per leaf (`K`)
    pub leaf_capacity: usize,
}

impl ForestParams {
    /// Creates validated parameters.
    pub fn new(tree_count: usize, leaf_capacity: usize) -> Result<Self, ForestError> {
        let params = Self {
            tree_count,
            leaf_capacity,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks that both counts are usable for a build.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.leaf_capacity < 1 {
            return Err(ForestError::InvalidLeafCapacity(self.leaf_capacity));
        }
        if self.tree_count < 1 {
            return Err(ForestError::InvalidTreeCount(self.tree_count));
        }
        Ok(())
    }
}

/// A single tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Internal node partitioning its items by a hyperplane.
    ///
    /// Items with `normal · x + offset > 0` (on unit-normalized vectors)
    /// belong to the right child.
    Split {
        normal: Box<[f32]>,
        offset: f32,
        left: u32,
        right: u32,
    },

    /// Terminal node holding at most `leaf_capacity` items.
    Leaf { items: Vec<ItemIndex> },
}

/// One random-projection tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Wraps a pre-order node arena. Use [`Forest::from_parts`] to validate it.
    #[must_use]
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// The root node, absent only for an invalid empty tree.
    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Node at an arena position.
    #[must_use]
    pub fn node(&self, id: u32) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// All nodes in pre-order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over leaves in pre-order.
    pub fn leaves(&self) -> impl Iterator<Item = &[ItemIndex]> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Leaf { items } => Some(items.as_slice()),
            Node::Split { .. } => None,
        })
    }

    /// Length of the longest root-to-leaf path, counted in edges.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0u32, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match self.node(id) {
                Some(Node::Split { left, right, .. }) => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                Some(Node::Leaf { .. }) => max_depth = max_depth.max(depth),
                None => {}
            }
        }
        max_depth
    }

    fn validate(
        &self,
        tree: usize,
        dimension: VectorDimension,
        item_count: usize,
        leaf_capacity: usize,
    ) -> Result<(), ForestError> {
        if self.nodes.is_empty() {
            return Err(ForestError::InvalidStructure(format!(
                "tree {tree} has no nodes"
            )));
        }

        let mut referenced = vec![false; self.nodes.len()];
        referenced[0] = true;

        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    normal,
                    left,
                    right,
                    ..
                } => {
                    if normal.len() != dimension.get() {
                        return Err(ForestError::DimensionMismatch {
                            expected: dimension.get(),
                            actual: normal.len(),
                        });
                    }
                    for child in [*left, *right] {
                        let child = child as usize;
                        if child <= id || child >= self.nodes.len() {
                            return Err(ForestError::InvalidStructure(format!(
                                "tree {tree} node {id} points to invalid child {child}"
                            )));
                        }
                        if std::mem::replace(&mut referenced[child], true) {
                            return Err(ForestError::InvalidStructure(format!(
                                "tree {tree} node {child} has more than one parent"
                            )));
                        }
                    }
                }
                Node::Leaf { items } => {
                    if items.len() > leaf_capacity {
                        return Err(ForestError::InvalidStructure(format!(
                            "tree {tree} leaf {id} holds {} items, capacity is {leaf_capacity}",
                            items.len()
                        )));
                    }
                    if let Some(item) = items.iter().find(|i| i.as_usize() >= item_count) {
                        return Err(ForestError::ItemOutOfRange(item.get()));
                    }
                }
            }
        }

        if let Some(orphan) = referenced.iter().position(|r| !r) {
            return Err(ForestError::InvalidStructure(format!(
                "tree {tree} node {orphan} is unreachable"
            )));
        }

        Ok(())
    }
}

/// Summary statistics of a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestStats {
    pub tree_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
}

/// An immutable collection of trees over the same item set.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    dimension: VectorDimension,
    item_count: usize,
    leaf_capacity: usize,
    trees: Vec<Tree>,
}

impl Forest {
    /// Assembles a forest, validating every tree against the header values.
    pub fn from_parts(
        dimension: VectorDimension,
        item_count: usize,
        leaf_capacity: usize,
        trees: Vec<Tree>,
    ) -> Result<Self, ForestError> {
        if leaf_capacity < 1 {
            return Err(ForestError::InvalidLeafCapacity(leaf_capacity));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(i, dimension, item_count, leaf_capacity)?;
        }
        Ok(Self {
            dimension,
            item_count,
            leaf_capacity,
            trees,
        })
    }

    /// Checks that this forest was built over `store`.
    pub fn validate_against(&self, store: &VectorStore) -> Result<(), ForestError> {
        if store.dimension() != self.dimension {
            return Err(ForestError::DimensionMismatch {
                expected: self.dimension.get(),
                actual: store.dimension().get(),
            });
        }
        if store.len() != self.item_count {
            return Err(ForestError::ItemCountMismatch {
                expected: self.item_count,
                actual: store.len(),
            });
        }
        Ok(())
    }

    /// Vector dimension `D`.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Number of indexed items `N`.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Leaf capacity `K`.
    #[must_use]
    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// The trees in build order.
    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Number of trees `T`.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Computes node, leaf, and depth statistics.
    #[must_use]
    pub fn stats(&self) -> ForestStats {
        let mut stats = ForestStats {
            tree_count: self.trees.len(),
            node_count: 0,
            leaf_count: 0,
            max_depth: 0,
            max_leaf_size: 0,
        };
        for tree in &self.trees {
            stats.node_count += tree.len();
            stats.max_depth = stats.max_depth.max(tree.depth());
            for leaf in tree.leaves() {
                stats.leaf_count += 1;
                stats.max_leaf_size = stats.max_leaf_size.max(leaf.len());
            }
        }
        stats
    }
}
