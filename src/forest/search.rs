//! Approximate k-nearest-neighbor search over a forest.
//!
//! # Algorithm
//! 1. Enqueue every tree root with priority `+∞`
//! 2. Pop the most promising node. A split pushes both children, each with
//!    the smaller of its parent's priority and the query's signed margin
//!    toward that child, so the near side wins and the far side waits
//! 3. A leaf contributes its items to a deduplicated candidate set
//! 4. Stop once the set holds `k + candidate_slack` items or the queue is empty
//! 5. Rank candidates by exact angular distance, ties by internal index
//!
//! Searching is read-only and involves no randomness: the same query against
//! the same forest always yields the same result.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use serde::Serialize;

use crate::forest::{Forest, ForestError, Node};
use crate::vector::{
    ItemIndex, VectorStore, angular_distance_with_norms, margin, normalize, squared_norm,
};

/// Default number of extra candidates gathered beyond `k`.
pub const DEFAULT_CANDIDATE_SLACK: usize = 25;

/// A search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub index: ItemIndex,
    pub distance: f32,
}

/// A node waiting in the search queue.
#[derive(Debug, Clone, Copy)]
struct QueuedNode {
    priority: f32,
    tree: u32,
    node: u32,
}

impl PartialEq for QueuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedNode {}

impl PartialOrd for QueuedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode {
    // Max-heap on priority; equal priorities pop lower tree, then lower node first
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.tree.cmp(&self.tree))
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Query engine over a forest and the store it was built from.
#[derive(Debug, Clone, Copy)]
pub struct SearchEngine<'a> {
    forest: &'a Forest,
    store: &'a VectorStore,
    candidate_slack: usize,
}

impl<'a> SearchEngine<'a> {
    /// Pairs a forest with its store.
    ///
    /// Fails when the two disagree on dimension or item count.
    pub fn new(forest: &'a Forest, store: &'a VectorStore) -> Result<Self, ForestError> {
        forest.validate_against(store)?;
        Ok(Self {
            forest,
            store,
            candidate_slack: DEFAULT_CANDIDATE_SLACK,
        })
    }

    /// Overrides the number of extra candidates gathered beyond `k`.
    #[must_use]
    pub fn with_candidate_slack(mut self, candidate_slack: usize) -> Self {
        self.candidate_slack = candidate_slack;
        self
    }

    /// Finds up to `k` approximate nearest neighbors of `query`.
    ///
    /// Results are ordered by ascending angular distance, then ascending
    /// index, without duplicates. Fewer than `k` results means fewer
    /// distinct candidates were reachable, which is not an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, ForestError> {
        if self.forest.tree_count() == 0 {
            return Err(ForestError::EmptyIndex);
        }
        self.forest
            .dimension()
            .validate_vector(query)
            .map_err(ForestError::from)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let budget = k.saturating_add(self.candidate_slack);
        let candidates = self.collect_candidates(&normalize(query), budget);

        let query_norm_sq = squared_norm(query);
        let mut neighbors: Vec<Neighbor> = candidates
            .into_iter()
            .filter_map(|index| {
                let vector = self.store.vector(index)?;
                let norm_sq = self.store.squared_norm(index)?;
                Some(Neighbor {
                    index,
                    distance: angular_distance_with_norms(query, query_norm_sq, vector, norm_sq),
                })
            })
            .collect();

        neighbors.sort_unstable_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Finds neighbors of an indexed item, using its own embedding as query.
    ///
    /// The item itself is normally the first result, at distance 0.
    pub fn search_item(&self, index: ItemIndex, k: usize) -> Result<Vec<Neighbor>, ForestError> {
        let vector = self
            .store
            .vector(index)
            .ok_or(ForestError::ItemOutOfRange(index.get()))?;
        self.search(vector, k)
    }

    /// Walks the forest best-first until `budget` distinct items are found.
    fn collect_candidates(&self, unit_query: &[f32], budget: usize) -> Vec<ItemIndex> {
        let trees = self.forest.trees();
        let mut queue: BinaryHeap<QueuedNode> = trees
            .iter()
            .enumerate()
            .map(|(tree, _)| QueuedNode {
                priority: f32::INFINITY,
                tree: tree as u32,
                node: 0,
            })
            .collect();

        // Never more distinct items than the store holds
        let capacity = budget.min(self.store.len());
        let mut seen = HashSet::with_capacity(capacity);
        let mut candidates = Vec::with_capacity(capacity);

        while candidates.len() < budget {
            let Some(queued) = queue.pop() else {
                break;
            };
            let Some(node) = trees
                .get(queued.tree as usize)
                .and_then(|tree| tree.node(queued.node))
            else {
                continue;
            };

            match node {
                Node::Leaf { items } => {
                    for &item in items {
                        if seen.insert(item) {
                            candidates.push(item);
                        }
                    }
                }
                Node::Split {
                    normal,
                    offset,
                    left,
                    right,
                } => {
                    let m = margin(normal, *offset, unit_query);
                    queue.push(QueuedNode {
                        priority: queued.priority.min(m),
                        tree: queued.tree,
                        node: *right,
                    });
                    queue.push(QueuedNode {
                        priority: queued.priority.min(-m),
                        tree: queued.tree,
                        node: *left,
                    });
                }
            }
        }

        candidates
    }
}
