//! Index persistence and the shared snapshot served to queries

mod handle;
pub mod metadata;
pub mod persistence;

pub use handle::{IndexHandle, IndexSnapshot};
pub use metadata::IndexMetadata;
pub use persistence::IndexPersistence;
