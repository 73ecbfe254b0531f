//! Release identifier parsing.
//!
//! Accepted inputs are a Discogs release page URL, with or without the
//! trailing title slug, or a bare positive release id:
//! - `https://www.discogs.com/release/249504`
//! - `https://www.discogs.com/release/249504-Rick-Astley-Never-Gonna-Give-You-Up`
//! - `249504`

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::RecommendError;
use crate::vector::ReleaseId;

static RELEASE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://www\.discogs\.com/release/(\d+)(?:-[a-zA-Z0-9\-]+)?$")
        .expect("Invalid regex")
});

/// A validated query identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseQuery {
    release_id: ReleaseId,
}

impl ReleaseQuery {
    /// Validates `input` before any index lookup happens.
    pub fn parse(input: &str) -> Result<Self, RecommendError> {
        let trimmed = input.trim();
        let digits = match RELEASE_URL.captures(trimmed) {
            Some(captures) => captures.get(1).map(|m| m.as_str()),
            None if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) => {
                Some(trimmed)
            }
            None => None,
        };

        digits
            .and_then(|d| d.parse::<u64>().ok())
            .and_then(ReleaseId::new)
            .map(|release_id| Self { release_id })
            .ok_or_else(|| RecommendError::MalformedIdentifier {
                input: input.to_string(),
            })
    }

    #[must_use]
    pub fn release_id(&self) -> ReleaseId {
        self.release_id
    }
}

impl From<ReleaseId> for ReleaseQuery {
    fn from(release_id: ReleaseId) -> Self {
        Self { release_id }
    }
}

impl FromStr for ReleaseQuery {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Builds the public page URL of a release.
#[must_use]
pub fn release_url(base_url: &str, release_id: ReleaseId) -> String {
    format!("{}/{release_id}", base_url.trim_end_matches('/'))
}
