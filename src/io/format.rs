//! Output formats for CLI commands.
//!
//! Text output goes through [`crate::display`]; JSON output wraps every
//! payload in a [`JsonResponse`] so scripts see one shape for success and
//! failure alike.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, RecommendError};
use crate::io::exit_code::ExitCode;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Text,
    /// JSON for scripting
    Json,
}

impl OutputFormat {
    /// Create format from JSON flag.
    #[must_use]
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    /// Check if format is JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Standard JSON response format.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResponse<T = serde_json::Value>
where
    T: Serialize,
{
    /// Status: "success" or "error"
    pub status: String,

    /// Result code (e.g., "OK", "UNKNOWN_ITEM", "INDEX_CORRUPTED")
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Actual data payload (only for success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Recovery suggestions (only for errors)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,

    /// Exit code for shell scripts
    pub exit_code: u8,

    /// Execution time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl<T> JsonResponse<T>
where
    T: Serialize,
{
    /// Create a success response with data.
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            code: "OK".to_string(),
            message: "Operation completed successfully".to_string(),
            data: Some(data),
            suggestions: Vec::new(),
            exit_code: ExitCode::Success as u8,
            execution_time_ms: None,
        }
    }

    /// Record how long the command took.
    pub fn with_elapsed(mut self, elapsed: std::time::Duration) -> Self {
        self.execution_time_ms = Some(elapsed.as_millis() as u64);
        self
    }
}

impl JsonResponse<serde_json::Value> {
    /// Create an error response from IndexError.
    pub fn from_error(error: &IndexError) -> Self {
        Self::failure(
            error.status_code(),
            error.to_string(),
            error
                .recovery_suggestions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ExitCode::from_error(error),
        )
    }

    /// Create an error response from RecommendError.
    pub fn from_recommend_error(error: &RecommendError) -> Self {
        Self::failure(
            error.status_code(),
            error.to_string(),
            Vec::new(),
            ExitCode::from_recommend_error(error),
        )
    }

    fn failure(code: String, message: String, suggestions: Vec<String>, exit: ExitCode) -> Self {
        Self {
            status: "error".to_string(),
            code,
            message,
            data: None,
            suggestions,
            exit_code: exit as u8,
            execution_time_ms: None,
        }
    }
}
