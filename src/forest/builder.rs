//! Random-projection forest construction.
//!
//! Every tree partitions the full item set recursively: two random pivots
//! define the hyperplane equidistant from both (on unit-normalized vectors),
//! and items are routed by the side they fall on. Trees are independent, so
//! they are built in parallel, each from its own seed drawn up front from the
//! caller's random source. The same seed therefore yields the same forest no
//! matter how the work is scheduled.
//!
//! # Algorithm Details
//! - Terminal case: node set size ≤ leaf capacity `K`
//! - Pivots: two distinct items, sampled without replacement
//! - Degenerate splits (one side empty) are retried with fresh pivots, then
//!   resolved by round-robin assignment, which always makes progress

use std::time::Instant;

use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, RngCore, SeedableRng};
use rayon::prelude::*;

use crate::forest::{Forest, ForestError, ForestParams, Node, Tree};
use crate::vector::{ItemIndex, VectorStore, dot, normalize};

/// Pivot draws attempted before falling back to round-robin assignment.
const MAX_SPLIT_ATTEMPTS: usize = 3;

/// Builds forests over a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct ForestBuilder {
    params: ForestParams,

    /// Worker thread count; `None` uses the global rayon pool
    threads: Option<usize>,

    /// Incremented once per finished tree
    progress: Option<ProgressBar>,
}

impl ForestBuilder {
    /// Creates a builder for the given parameters.
    #[must_use]
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            threads: None,
            progress: None,
        }
    }

    /// Limits the build to `threads` worker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// Reports finished trees on a progress bar.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The parameters this builder uses.
    #[must_use]
    pub fn params(&self) -> ForestParams {
        self.params
    }

    /// Builds a forest using the thread-local entropy source.
    pub fn build(&self, store: &VectorStore) -> Result<Forest, ForestError> {
        self.build_with_rng(store, &mut rand::rng())
    }

    /// Builds a reproducible forest from a fixed seed.
    pub fn build_seeded(&self, store: &VectorStore, seed: u64) -> Result<Forest, ForestError> {
        self.build_with_rng(store, &mut StdRng::seed_from_u64(seed))
    }

    /// Builds a forest, drawing one seed per tree from `rng`.
    pub fn build_with_rng<R: RngCore + ?Sized>(
        &self,
        store: &VectorStore,
        rng: &mut R,
    ) -> Result<Forest, ForestError> {
        self.params.validate()?;
        if store.is_empty() {
            return Err(ForestError::EmptyDataset);
        }

        let started = Instant::now();
        let seeds: Vec<u64> = (0..self.params.tree_count)
            .map(|_| rng.next_u64())
            .collect();
        let units = UnitVectors::from_store(store);

        tracing::info!(
            items = store.len(),
            dimension = store.dimension().get(),
            trees = self.params.tree_count,
            leaf_capacity = self.params.leaf_capacity,
            "building forest"
        );

        let build_all = || {
            seeds
                .par_iter()
                .map(|&seed| {
                    let mut tree_rng = StdRng::seed_from_u64(seed);
                    let tree = build_tree(&units, self.params.leaf_capacity, &mut tree_rng);
                    if let Some(progress) = &self.progress {
                        progress.inc(1);
                    }
                    tree
                })
                .collect::<Result<Vec<Tree>, ForestError>>()
        };

        let trees = match self.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| ForestError::ThreadPool(e.to_string()))?
                .install(build_all)?,
            None => build_all()?,
        };

        let forest = Forest::from_parts(
            store.dimension(),
            store.len(),
            self.params.leaf_capacity,
            trees,
        )?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            nodes = forest.stats().node_count,
            "forest built"
        );
        Ok(forest)
    }
}

/// Unit-normalized copy of every embedding, shared read-only by all trees.
struct UnitVectors {
    dimension: usize,
    data: Vec<f32>,
}

impl UnitVectors {
    fn from_store(store: &VectorStore) -> Self {
        let dimension = store.dimension().get();
        let mut data = Vec::with_capacity(store.len() * dimension);
        for index in 0..store.len() {
            if let Some(vector) = ItemIndex::from_usize(index).and_then(|i| store.vector(i)) {
                data.extend(normalize(vector));
            }
        }
        Self { dimension, data }
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn get(&self, index: ItemIndex) -> &[f32] {
        let start = index.as_usize() * self.dimension;
        &self.data[start..start + self.dimension]
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A node set waiting to be turned into a subtree.
struct PendingNode {
    items: Vec<ItemIndex>,
    parent: Option<(usize, Side)>,
}

/// The outcome of partitioning one node set.
struct Partition {
    normal: Vec<f32>,
    offset: f32,
    left: Vec<ItemIndex>,
    right: Vec<ItemIndex>,
}

/// Builds one tree as a pre-order node arena.
///
/// Uses an explicit stack so that unbalanced splits cannot exhaust the
/// call stack. Pushing the right subtree before the left one makes nodes
/// come off the stack in pre-order.
fn build_tree(
    units: &UnitVectors,
    leaf_capacity: usize,
    rng: &mut StdRng,
) -> Result<Tree, ForestError> {
    let all_items = (0..units.len())
        .map(|i| {
            ItemIndex::from_usize(i)
                .ok_or_else(|| ForestError::InvalidStructure(format!("item {i} exceeds u32")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut nodes: Vec<Node> = Vec::new();
    let mut stack = vec![PendingNode {
        items: all_items,
        parent: None,
    }];
    let mut fallback_splits = 0usize;

    while let Some(pending) = stack.pop() {
        let id = u32::try_from(nodes.len())
            .map_err(|_| ForestError::InvalidStructure("tree exceeds u32 nodes".to_string()))?;

        if let Some((parent, side)) = pending.parent {
            if let Node::Split { left, right, .. } = &mut nodes[parent] {
                match side {
                    Side::Left => *left = id,
                    Side::Right => *right = id,
                }
            }
        }

        if pending.items.len() <= leaf_capacity {
            nodes.push(Node::Leaf {
                items: pending.items,
            });
            continue;
        }

        let (partition, degenerate) = split_items(units, pending.items, rng);
        if degenerate {
            fallback_splits += 1;
        }

        let position = nodes.len();
        nodes.push(Node::Split {
            normal: partition.normal.into_boxed_slice(),
            offset: partition.offset,
            left: 0,
            right: 0,
        });
        stack.push(PendingNode {
            items: partition.right,
            parent: Some((position, Side::Right)),
        });
        stack.push(PendingNode {
            items: partition.left,
            parent: Some((position, Side::Left)),
        });
    }

    if fallback_splits > 0 {
        tracing::debug!(fallback_splits, "tree used round-robin splits");
    }

    Ok(Tree::from_nodes(nodes))
}

/// Partitions `items` (at least two) by a random pivot hyperplane.
///
/// Returns the partition and whether it had to fall back to round-robin.
fn split_items<R: Rng + ?Sized>(
    units: &UnitVectors,
    items: Vec<ItemIndex>,
    rng: &mut R,
) -> (Partition, bool) {
    debug_assert!(items.len() >= 2);

    let mut last_plane = None;
    for _ in 0..MAX_SPLIT_ATTEMPTS {
        let pivots = sample(rng, items.len(), 2);
        let a = units.get(items[pivots.index(0)]);
        let b = units.get(items[pivots.index(1)]);
        let (normal, offset) = bisecting_hyperplane(a, b);

        let (left, right): (Vec<ItemIndex>, Vec<ItemIndex>) = items
            .iter()
            .copied()
            .partition(|&item| side_of(&normal, offset, units.get(item)));

        if !left.is_empty() && !right.is_empty() {
            return (
                Partition {
                    normal,
                    offset,
                    left,
                    right,
                },
                false,
            );
        }
        last_plane = Some((normal, offset));
    }

    let (normal, offset) = last_plane.unwrap_or_else(|| (vec![0.0; units.dimension], 0.0));
    let mut left = Vec::with_capacity(items.len() / 2 + 1);
    let mut right = Vec::with_capacity(items.len() / 2);
    for (position, item) in items.into_iter().enumerate() {
        if position % 2 == 0 {
            left.push(item);
        } else {
            right.push(item);
        }
    }
    (
        Partition {
            normal,
            offset,
            left,
            right,
        },
        true,
    )
}

/// `true` when `point` belongs to the left child.
fn side_of(normal: &[f32], offset: f32, point: &[f32]) -> bool {
    crate::vector::margin(normal, offset, point) <= 0.0
}

/// Hyperplane through the midpoint of `a` and `b`, perpendicular to `a - b`.
///
/// The normal is scaled to unit length so margins are comparable between
/// nodes during search. Identical pivots yield a zero normal.
fn bisecting_hyperplane(a: &[f32], b: &[f32]) -> (Vec<f32>, f32) {
    let difference: Vec<f32> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let normal = normalize(&difference);
    let midpoint: Vec<f32> = a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect();
    let offset = -dot(&normal, &midpoint) as f32;
    (normal, offset)
}
