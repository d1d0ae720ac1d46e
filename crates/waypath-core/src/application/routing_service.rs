use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::{
    application::graph_store::GraphStore,
    application::token_ledger::TokenLedger,
    domain::graph::{GraphId, PrincipalId},
    domain::path_finder::shortest_path,
    domain::repository::TripRepository,
    domain::trip::{TripId, TripRecord},
    CoreError,
};

/// Result of a paid path execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathExecution {
    /// Nodes from start to goal inclusive
    pub path: Vec<String>,

    /// Accumulated weight of `path`
    pub cost: f64,

    /// Tokens debited from the executor
    pub charged: f64,

    /// Executor balance after the debit
    pub residual_balance: f64,

    /// Wall-clock duration of the search
    pub execution_time_ms: u64,

    /// Trip history entry for this execution
    pub trip_id: TripId,
}

/// Runs shortest-path searches and bills the executor for them
pub struct RoutingService {
    graph_store: Arc<GraphStore>,
    ledger: Arc<TokenLedger>,
    trips: Arc<dyn TripRepository>,
}

impl RoutingService {
    /// Create a new routing service
    pub fn new(
        graph_store: Arc<GraphStore>,
        ledger: Arc<TokenLedger>,
        trips: Arc<dyn TripRepository>,
    ) -> Self {
        Self {
            graph_store,
            ledger,
            trips,
        }
    }

    /// Find the cheapest route from `start` to `goal`, charging the graph's
    /// frozen cost to `executor` and recording the trip
    pub async fn compute_path(
        &self,
        graph_id: &GraphId,
        executor: &PrincipalId,
        start: &str,
        goal: &str,
    ) -> Result<PathExecution, CoreError> {
        // Owned snapshot; edge updates committed during the search are not observed
        let graph = self.graph_store.get_graph(graph_id).await?;
        let charge = graph.cost;

        let available = self.ledger.balance(executor).await?;
        if available < charge {
            return Err(CoreError::InsufficientTokens {
                principal: executor.0.clone(),
                required: charge,
                available,
            });
        }

        let started = Instant::now();
        let result = shortest_path(&graph.adjacency, start, goal)?;
        let elapsed = started.elapsed();
        let execution_time_ms = elapsed.as_millis() as u64;

        // The pre-check is advisory; this debit decides
        let residual_balance = self.ledger.debit(executor, charge).await?;

        let trip = TripRecord::new(
            graph_id.clone(),
            executor.clone(),
            start,
            goal,
            &result,
            charge,
            execution_time_ms,
        );
        if let Err(e) = self.trips.insert(&trip).await {
            tracing::error!(graph_id = %graph_id, executor = %executor, error = %e, "Trip insert failed, refunding");
            if let Err(refund_err) = self.ledger.credit(executor, charge).await {
                tracing::error!(
                    executor = %executor,
                    amount = charge,
                    error = %refund_err,
                    "Refund after failed trip insert did not go through"
                );
            }
            return Err(e);
        }

        metrics::increment_counter!("waypath_path_executions_total");
        metrics::histogram!("waypath_path_duration_seconds", elapsed.as_secs_f64());
        tracing::info!(
            graph_id = %graph_id,
            executor = %executor,
            start,
            goal,
            hops = result.path.len(),
            cost = result.cost,
            charged = charge,
            execution_time_ms,
            "Path computed"
        );

        Ok(PathExecution {
            path: result.path,
            cost: result.cost,
            charged: charge,
            residual_balance,
            execution_time_ms,
            trip_id: trip.id,
        })
    }

    /// Trip history, optionally for one executor
    pub async fn list_trips(&self, executor: Option<&PrincipalId>) -> Result<Vec<TripRecord>, CoreError> {
        self.trips.list(executor).await
    }
}
