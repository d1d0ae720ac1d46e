use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::adjacency::Adjacency;

/// Value object: Graph ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub String);

/// Value object: Principal ID, as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl GraphId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate: stored graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Unique identifier
    pub id: GraphId,

    /// Principal that created the graph
    pub owner: PrincipalId,

    /// Nodes and weighted edges
    pub adjacency: Adjacency,

    /// Token price frozen at creation, charged on every execution
    pub cost: f64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Graph {
    /// Create a new graph record with a generated ID
    pub fn new(owner: PrincipalId, adjacency: Adjacency, cost: f64) -> Self {
        Self {
            id: GraphId::generate(),
            owner,
            adjacency,
            cost,
            created_at: Utc::now(),
        }
    }

    /// Listing projection
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            graph_id: self.id.clone(),
            owner: self.owner.clone(),
            cost: self.cost,
        }
    }
}

/// Listing entry for a stored graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Graph ID
    pub graph_id: GraphId,

    /// Owner
    pub owner: PrincipalId,

    /// Frozen cost
    pub cost: f64,
}
