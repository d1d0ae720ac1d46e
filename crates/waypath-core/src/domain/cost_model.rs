//! Token pricing of graphs
//!
//! The price only depends on the shape of the adjacency: one rate per source
//! node and one per edge. Nodes that only ever appear as destinations are free.

use serde::{Deserialize, Serialize};

use super::adjacency::Adjacency;
use crate::config::PricingConfig;

/// Pure pricing function for graphs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    node_rate: f64,
    edge_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::from(&PricingConfig::default())
    }
}

impl From<&PricingConfig> for CostModel {
    fn from(config: &PricingConfig) -> Self {
        Self {
            node_rate: config.node_rate,
            edge_rate: config.edge_rate,
        }
    }
}

impl CostModel {
    /// Price of a graph shape, rounded half-up to two decimals
    pub fn price(&self, adjacency: &Adjacency) -> f64 {
        self.price_counts(adjacency.source_count(), adjacency.edge_count())
    }

    /// Price for explicit node and edge counts
    pub fn price_counts(&self, node_count: usize, edge_count: usize) -> f64 {
        round_cents(self.node_rate * node_count as f64 + self.edge_rate * edge_count as f64)
    }
}

/// Round half-up to two decimals
///
/// Products such as `0.1 * 3` land a hair above or below the exact decimal, so
/// the scaled value is snapped to the nearest 1e-6 before rounding.
fn round_cents(value: f64) -> f64 {
    let scaled = (value * 100.0 * 1e6).round() / 1e6;
    (scaled + 0.5).floor() / 100.0
}
