use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::graph::{GraphId, PrincipalId};
use super::path_finder::PathResult;

/// Value object: Trip ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripId(pub String);

/// Record of one paid path execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Unique identifier
    pub id: TripId,

    /// Graph that was executed
    pub graph_id: GraphId,

    /// Principal that paid for the execution
    pub executor: PrincipalId,

    /// Requested start node
    pub start: String,

    /// Requested goal node
    pub goal: String,

    /// Resulting route
    pub path: Vec<String>,

    /// Accumulated weight of `path`
    pub path_cost: f64,

    /// Tokens debited for the execution
    pub charged: f64,

    /// Wall-clock duration of the search
    pub execution_time_ms: u64,

    /// Execution timestamp
    pub executed_at: DateTime<Utc>,
}

impl TripRecord {
    /// Build a record for a completed search
    pub fn new(
        graph_id: GraphId,
        executor: PrincipalId,
        start: &str,
        goal: &str,
        result: &PathResult,
        charged: f64,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            id: TripId(Uuid::new_v4().to_string()),
            graph_id,
            executor,
            start: start.to_string(),
            goal: goal.to_string(),
            path: result.path.clone(),
            path_cost: result.cost,
            charged,
            execution_time_ms,
            executed_at: Utc::now(),
        }
    }
}
