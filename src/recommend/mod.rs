//! Query surface: release identifiers in, diversified recommendations out.

mod engine;
mod query;

pub use engine::{
    DEFAULT_OVERSAMPLE, DEFAULT_RELEASE_BASE_URL, RawNeighbor, RecommendConfig,
    RecommendationItem, Recommender,
};
pub use query::{ReleaseQuery, release_url};
