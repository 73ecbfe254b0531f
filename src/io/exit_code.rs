//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - critical failure that should halt automation
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::error::{IndexError, RecommendError};
use crate::forest::ForestError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Critical error that should halt automation (code 2)
    BlockingError = 2,

    /// Release not indexed, or nothing to recommend (code 3)
    NotFound = 3,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Index corruption detected (code 7)
    IndexCorrupted = 7,

    /// Input rejected before any lookup (code 9)
    InvalidInput = 9,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// Convert an `IndexError` to the appropriate exit code.
    pub fn from_error(error: &IndexError) -> Self {
        match error {
            IndexError::NotBuilt { .. } => ExitCode::NotFound,

            IndexError::IndexCorrupted { .. }
            | IndexError::Metadata { .. }
            | IndexError::Forest(ForestError::Serialization(_) | ForestError::VersionMismatch { .. }) => {
                ExitCode::IndexCorrupted
            }

            IndexError::FileRead { .. }
            | IndexError::FileWrite { .. }
            | IndexError::Forest(ForestError::Io(_)) => ExitCode::IoError,
            IndexError::ConfigError { .. } => ExitCode::ConfigError,

            // Bad input data aborts a build
            IndexError::Vector(_) | IndexError::Catalog(_) => ExitCode::BlockingError,

            _ => ExitCode::GeneralError,
        }
    }

    /// Convert a `RecommendError` to the appropriate exit code.
    pub fn from_recommend_error(error: &RecommendError) -> Self {
        match error {
            RecommendError::MalformedIdentifier { .. } => ExitCode::InvalidInput,
            RecommendError::UnknownItem { .. } | RecommendError::NoRecommendations { .. } => {
                ExitCode::NotFound
            }
            RecommendError::Search(_) | RecommendError::Catalog(_) => ExitCode::IndexCorrupted,
        }
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Blocking error - automation should halt",
            ExitCode::NotFound => "Not found",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::IndexCorrupted => "Index corrupted",
            ExitCode::InvalidInput => "Invalid input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::ReleaseId;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as u8, 0);
        assert_eq!(ExitCode::GeneralError as u8, 1);
        assert_eq!(ExitCode::BlockingError as u8, 2);
        assert_eq!(ExitCode::NotFound as u8, 3);
        assert_eq!(i32::from(ExitCode::InvalidInput), 9);
    }

    #[test]
    fn test_index_error_mapping() {
        let not_built = IndexError::NotBuilt {
            path: PathBuf::from("index"),
        };
        assert_eq!(ExitCode::from_error(&not_built), ExitCode::NotFound);

        let corrupted = IndexError::Forest(ForestError::Serialization("short".to_string()));
        assert_eq!(ExitCode::from_error(&corrupted), ExitCode::IndexCorrupted);

        let config = IndexError::ConfigError {
            reason: "bad".to_string(),
        };
        assert_eq!(ExitCode::from_error(&config), ExitCode::ConfigError);
    }

    #[test]
    fn test_recommend_error_mapping() {
        let id = ReleaseId::new(3).unwrap();
        assert_eq!(
            ExitCode::from_recommend_error(&RecommendError::MalformedIdentifier {
                input: "x".to_string()
            }),
            ExitCode::InvalidInput
        );
        assert_eq!(
            ExitCode::from_recommend_error(&RecommendError::UnknownItem { release_id: id }),
            ExitCode::NotFound
        );
    }
}
