//! Output handling for the CLI.
//!
//! This module provides:
//! - Output formats (text, JSON)
//! - Consistent exit codes

pub mod exit_code;
pub mod format;

pub use exit_code::ExitCode;
pub use format::{JsonResponse, OutputFormat};
