//! Terminal display utilities for CLI output.
//!
//! Provides styled tables, progress bars, and a shared color theme.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_progress_bar, create_spinner, with_spinner};
pub use tables::{
    TableBuilder, create_index_summary_table, create_neighbor_table, create_recommendation_table,
};
pub use theme::{THEME, Theme};
