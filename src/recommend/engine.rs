//! Recommendation engine: neighbor search plus result post-processing.
//!
//! For a query release the engine searches the forest with the release's
//! own embedding, oversampling by a configurable slack, then walks the
//! candidates nearest first:
//! - the query release itself is skipped wherever it shows up
//! - a candidate whose artist (trimmed, case-insensitive) was already
//!   emitted is skipped, so every artist appears at most once
//!
//! The walk stops at the requested count or when candidates run out, so a
//! short list is a valid answer.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::error::{RecommendError, RecommendResult};
use crate::forest::DEFAULT_CANDIDATE_SLACK;
use crate::recommend::query::{ReleaseQuery, release_url};
use crate::storage::IndexHandle;
use crate::vector::ReleaseId;

/// Default extra neighbors requested beyond the desired count.
pub const DEFAULT_OVERSAMPLE: usize = 25;

/// Default base of generated release URLs.
pub const DEFAULT_RELEASE_BASE_URL: &str = "https://www.discogs.com/release";

/// Tuning knobs of the recommendation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendConfig {
    /// Extra neighbors fetched to absorb self-matches and diversity drops
    pub oversample: usize,

    /// Extra candidates the search gathers beyond the requested neighbors
    pub candidate_slack: usize,

    pub release_base_url: String,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            oversample: DEFAULT_OVERSAMPLE,
            candidate_slack: DEFAULT_CANDIDATE_SLACK,
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
        }
    }
}

impl From<&Settings> for RecommendConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            oversample: settings.recommend.oversample,
            candidate_slack: settings.search.candidate_slack,
            release_base_url: settings.recommend.release_base_url.clone(),
        }
    }
}

/// One recommended release.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationItem {
    pub release_id: ReleaseId,
    pub artist: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub url: String,
    pub distance: f32,
}

/// A raw search hit, before any filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawNeighbor {
    pub release_id: ReleaseId,
    pub distance: f32,
}

/// Answers recommendation queries against the current index snapshot.
#[derive(Debug, Clone)]
pub struct Recommender {
    handle: Arc<IndexHandle>,
    config: RecommendConfig,
}

impl Recommender {
    pub fn new(handle: Arc<IndexHandle>, config: RecommendConfig) -> Self {
        Self { handle, config }
    }

    #[must_use]
    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    /// Parses `input` and recommends up to `desired_count` releases.
    pub fn recommend_input(
        &self,
        input: &str,
        desired_count: usize,
    ) -> RecommendResult<Vec<RecommendationItem>> {
        let query = ReleaseQuery::parse(input)?;
        self.recommend(query, desired_count)
    }

    /// Recommends up to `desired_count` releases similar to `query`,
    /// at most one per artist.
    pub fn recommend(
        &self,
        query: ReleaseQuery,
        desired_count: usize,
    ) -> RecommendResult<Vec<RecommendationItem>> {
        let snapshot = self.handle.snapshot();
        let release_id = query.release_id();
        let index = snapshot
            .store()
            .index_of(release_id)
            .ok_or(RecommendError::UnknownItem { release_id })?;
        if desired_count == 0 {
            return Ok(Vec::new());
        }

        let engine = snapshot.search_engine(self.config.candidate_slack)?;
        let neighbors =
            engine.search_item(index, desired_count.saturating_add(self.config.oversample))?;

        let mut candidates = neighbors.into_iter().filter(|n| n.index != index).peekable();
        if candidates.peek().is_none() {
            return Err(RecommendError::NoRecommendations { release_id });
        }

        let catalog = snapshot.catalog();
        let mut seen_artists = HashSet::new();
        let mut results = Vec::with_capacity(desired_count.min(snapshot.store().len()));
        let mut skipped = 0usize;

        for neighbor in candidates {
            let record = catalog.attributes(neighbor.index)?;
            if !seen_artists.insert(record.normalized_artist()) {
                skipped += 1;
                continue;
            }

            results.push(RecommendationItem {
                release_id: record.release_id,
                artist: record.artist_name.clone(),
                title: record.release_title.clone(),
                label: record.label_name.clone(),
                url: release_url(&self.config.release_base_url, record.release_id),
                distance: neighbor.distance,
            });
            if results.len() == desired_count {
                break;
            }
        }

        debug!(
            %release_id,
            returned = results.len(),
            skipped_same_artist = skipped,
            "Recommendations computed"
        );
        Ok(results)
    }

    /// The raw `k` nearest neighbors of `query`, the query release included.
    pub fn neighbors(&self, query: ReleaseQuery, k: usize) -> RecommendResult<Vec<RawNeighbor>> {
        let snapshot = self.handle.snapshot();
        let release_id = query.release_id();
        let index = snapshot
            .store()
            .index_of(release_id)
            .ok_or(RecommendError::UnknownItem { release_id })?;

        let engine = snapshot.search_engine(self.config.candidate_slack)?;
        Ok(engine
            .search_item(index, k)?
            .into_iter()
            .filter_map(|n| {
                Some(RawNeighbor {
                    release_id: snapshot.store().release_id(n.index)?,
                    distance: n.distance,
                })
            })
            .collect())
    }
}
