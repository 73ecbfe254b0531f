//! Configuration module for the release recommender.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DISCOGS_REC_` and use double
//! underscores to separate nested levels:
//! - `DISCOGS_REC_BUILD__TREE_COUNT=500` sets `build.tree_count`
//! - `DISCOGS_REC_SEARCH__CANDIDATE_SLACK=50` sets `search.candidate_slack`
//! - `DISCOGS_REC_DEBUG=true` sets `debug`

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::forest::{DEFAULT_CANDIDATE_SLACK, ForestParams};
use crate::recommend::{DEFAULT_OVERSAMPLE, DEFAULT_RELEASE_BASE_URL};

/// Directory holding the settings file and, by default, the index
pub const LOCAL_DIR: &str = ".discogs-rec";

const ENV_PREFIX: &str = "DISCOGS_REC_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    /// Forest construction settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Query-time search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Recommendation post-processing settings
    #[serde(default)]
    pub recommend: RecommendSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BuildConfig {
    /// Number of trees in the forest
    #[serde(default = "default_tree_count")]
    pub tree_count: usize,

    /// Maximum number of items per leaf
    #[serde(default = "default_leaf_capacity")]
    pub leaf_capacity: usize,

    /// Fixed seed for reproducible builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Number of parallel threads for tree construction
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Embedding width produced by the upstream reduction step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_dimension: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Extra candidates gathered beyond the requested neighbor count
    #[serde(default = "default_candidate_slack")]
    pub candidate_slack: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RecommendSettings {
    /// Extra neighbors requested to make room for filtering
    #[serde(default = "default_oversample")]
    pub oversample: usize,

    /// Number of recommendations when none is requested
    #[serde(default = "default_count")]
    pub default_count: usize,

    /// Base of generated release URLs
    #[serde(default = "default_release_base_url")]
    pub release_base_url: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(LOCAL_DIR).join("index")
}
fn default_tree_count() -> usize {
    250
}
fn default_leaf_capacity() -> usize {
    32
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_candidate_slack() -> usize {
    DEFAULT_CANDIDATE_SLACK
}
fn default_oversample() -> usize {
    DEFAULT_OVERSAMPLE
}
fn default_count() -> usize {
    5
}
fn default_release_base_url() -> String {
    DEFAULT_RELEASE_BASE_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            debug: false,
            build: BuildConfig::default(),
            search: SearchConfig::default(),
            recommend: RecommendSettings::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tree_count: default_tree_count(),
            leaf_capacity: default_leaf_capacity(),
            seed: None,
            parallel_threads: default_parallel_threads(),
            expected_dimension: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_slack: default_candidate_slack(),
        }
    }
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self {
            oversample: default_oversample(),
            default_count: default_count(),
            release_base_url: default_release_base_url(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for the local directory
        let config_path =
            Self::find_workspace_config().unwrap_or_else(Self::default_config_path);
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore (__) separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from(LOCAL_DIR).join("settings.toml")
    }

    /// Find the settings file by searching from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(LOCAL_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Forest parameters from the `[build]` section
    pub fn forest_params(&self) -> IndexResult<ForestParams> {
        ForestParams::new(self.build.tree_count, self.build.leaf_capacity).map_err(|e| {
            IndexError::ConfigError {
                reason: e.to_string(),
            }
        })
    }

    /// Reject values no build or query could run with
    pub fn validate(&self) -> IndexResult<()> {
        self.forest_params()?;
        if self.build.parallel_threads == 0 {
            return Err(IndexError::ConfigError {
                reason: "build.parallel_threads must be at least 1".to_string(),
            });
        }
        if self.build.expected_dimension == Some(0) {
            return Err(IndexError::ConfigError {
                reason: "build.expected_dimension must be positive".to_string(),
            });
        }
        if self.recommend.release_base_url.trim().is_empty() {
            return Err(IndexError::ConfigError {
                reason: "recommend.release_base_url must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new("."), force)
    }

    /// Create a default settings file under `root`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(Self::default_config_path());

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# discogs-rec configuration file

# Version of the configuration schema
version = 1

# Path to the index directory (relative to the working directory)
index_path = "{LOCAL_DIR}/index"

# Global debug mode
debug = false

[build]
# Number of trees: more trees improve recall and cost memory and build time
tree_count = {tree_count}

# Maximum number of releases per leaf
leaf_capacity = {leaf_capacity}

# Fixed seed for reproducible builds (random when unset)
# seed = 42

# Number of parallel threads for tree construction (defaults to CPU count)
# parallel_threads = {threads}

# Width of the embedding matrix; builds fail when the matrix differs
# expected_dimension = 150

[search]
# Extra candidates gathered beyond the requested neighbor count
candidate_slack = {slack}

[recommend]
# Extra neighbors requested so filtering still leaves enough results
oversample = {oversample}

# Number of recommendations when --count is not given
default_count = {count}

# Base of generated release URLs
release_base_url = "{base_url}"
"#,
            tree_count = default_tree_count(),
            leaf_capacity = default_leaf_capacity(),
            threads = num_cpus::get(),
            slack = default_candidate_slack(),
            oversample = default_oversample(),
            count = default_count(),
            base_url = default_release_base_url(),
        );

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}
