//! Table formatting utilities for structured output.

use comfy_table::{Attribute, Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::forest::ForestStats;
use crate::recommend::{RawNeighbor, RecommendationItem};
use crate::storage::IndexMetadata;

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        Self { table }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

/// Table of recommendations in rank order.
pub fn create_recommendation_table(items: &[RecommendationItem]) -> String {
    items
        .iter()
        .enumerate()
        .fold(
            TableBuilder::new().set_headers(vec!["#", "Artist", "Title", "Label", "Link"]),
            |table, (rank, item)| {
                table.add_row(vec![
                    (rank + 1).to_string(),
                    item.artist.clone(),
                    item.title.clone(),
                    item.label.clone().unwrap_or_else(|| "-".to_string()),
                    item.url.clone(),
                ])
            },
        )
        .build()
}

/// Table of raw neighbors with their distances.
pub fn create_neighbor_table(neighbors: &[RawNeighbor]) -> String {
    neighbors
        .iter()
        .enumerate()
        .fold(
            TableBuilder::new().set_headers(vec!["#", "Release", "Distance"]),
            |table, (rank, n)| {
                table.add_row(vec![
                    (rank + 1).to_string(),
                    n.release_id.to_string(),
                    format!("{:.6}", n.distance),
                ])
            },
        )
        .build()
}

/// Summary of a built index.
pub fn create_index_summary_table(metadata: &IndexMetadata, stats: &ForestStats) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);

    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec!["Releases", &metadata.item_count.to_string()]);
    table.add_row(vec!["Dimension", &metadata.dimension.to_string()]);
    table.add_row(vec!["Trees", &stats.tree_count.to_string()]);
    table.add_row(vec!["Leaf capacity", &metadata.params.leaf_capacity.to_string()]);
    table.add_row(vec!["Nodes", &stats.node_count.to_string()]);
    table.add_row(vec!["Leaves", &stats.leaf_count.to_string()]);
    table.add_row(vec!["Max depth", &stats.max_depth.to_string()]);
    table.add_row(vec!["Largest leaf", &stats.max_leaf_size.to_string()]);
    table.add_row(vec![
        "Seed",
        &metadata
            .seed
            .map_or_else(|| "random".to_string(), |s| s.to_string()),
    ]);
    table.add_row(vec!["Build time", &format!("{} ms", metadata.build_millis)]);
    table.add_row(vec!["Built at", &metadata.created_at_display()]);

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::ReleaseId;

    #[test]
    fn test_recommendation_table_lists_items() {
        let items = vec![RecommendationItem {
            release_id: ReleaseId::new(249504).unwrap(),
            artist: "Rick Astley".to_string(),
            title: "Never Gonna Give You Up".to_string(),
            label: None,
            url: "https://www.discogs.com/release/249504".to_string(),
            distance: 0.12,
        }];
        let table = create_recommendation_table(&items);
        assert!(table.contains("Rick Astley"));
        assert!(table.contains("https://www.discogs.com/release/249504"));
        assert!(table.contains('-'));
    }

    #[test]
    fn test_neighbor_table_formats_distance() {
        let neighbors = vec![RawNeighbor {
            release_id: ReleaseId::new(7).unwrap(),
            distance: 0.5,
        }];
        assert!(create_neighbor_table(&neighbors).contains("0.500000"));
    }
}
