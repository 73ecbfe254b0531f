//! Random-projection forest for approximate nearest-neighbor search.
//!
//! A forest is a set of independently built binary trees. Every tree
//! recursively splits the item set with hyperplanes bisecting two randomly
//! sampled items until each leaf holds at most `leaf_capacity` items.
//! Searching descends all trees at once through a shared priority queue,
//! gathers candidates from the most promising leaves, then ranks them by
//! exact angular distance.
//!
//! Built forests are immutable and can be shared across threads freely.

mod builder;
pub mod codec;
mod error;
mod node;
mod search;

pub use builder::ForestBuilder;
pub use error::ForestError;
pub use node::{Forest, ForestParams, ForestStats, Node, Tree};
pub use search::{DEFAULT_CANDIDATE_SLACK, Neighbor, SearchEngine};
