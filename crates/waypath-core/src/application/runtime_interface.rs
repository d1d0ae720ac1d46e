use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    application::graph_store::GraphStore,
    application::moderator::{DecisionOutcome, ProposalOutcome, WeightUpdateModerator},
    application::routing_service::{PathExecution, RoutingService},
    application::token_ledger::TokenLedger,
    config::CoreConfig,
    domain::adjacency::Adjacency,
    domain::cost_model::CostModel,
    domain::graph::{Graph, GraphId, GraphSummary, PrincipalId},
    domain::repository::{
        GraphRepository, TokenAccountRepository, TripRepository, WeightUpdateRequestRepository,
    },
    domain::token_account::TokenAccount,
    domain::trip::TripRecord,
    domain::weight_update::{Decision, RequestId, WeightUpdateQuery, WeightUpdateRequest},
    CoreError,
};

/// Storage handles the runtime is built from
#[derive(Clone)]
pub struct Repositories {
    /// Graph records
    pub graphs: Arc<dyn GraphRepository>,

    /// Token accounts
    pub accounts: Arc<dyn TokenAccountRepository>,

    /// Weight update requests
    pub requests: Arc<dyn WeightUpdateRequestRepository>,

    /// Trip history
    pub trips: Arc<dyn TripRepository>,
}

/// Identifier and frozen price of a newly stored graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedGraph {
    /// New graph ID
    pub graph_id: GraphId,

    /// Tokens charged, also the per-execution price
    pub cost: f64,
}

/// Filter for the weight update history report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Only requests against this graph
    pub graph_id: Option<GraphId>,

    /// Created at or after
    pub created_from: Option<DateTime<Utc>>,

    /// Created at or before
    pub created_to: Option<DateTime<Utc>>,
}

impl From<HistoryFilter> for WeightUpdateQuery {
    fn from(filter: HistoryFilter) -> Self {
        WeightUpdateQuery {
            graph_id: filter.graph_id,
            status: None,
            created_from: filter.created_from,
            created_to: filter.created_to,
        }
    }
}

/// The API the Waypath core exposes to a transport layer
///
/// Callers are expected to have verified the principal they pass in; no
/// credential or role checks happen here.
#[derive(Clone)]
pub struct RuntimeInterface {
    graph_store: Arc<GraphStore>,
    ledger: Arc<TokenLedger>,
    moderator: Arc<WeightUpdateModerator>,
    routing: Arc<RoutingService>,
}

impl RuntimeInterface {
    /// Create a new runtime interface from already built services
    pub fn new(
        graph_store: Arc<GraphStore>,
        ledger: Arc<TokenLedger>,
        moderator: Arc<WeightUpdateModerator>,
        routing: Arc<RoutingService>,
    ) -> Self {
        Self {
            graph_store,
            ledger,
            moderator,
            routing,
        }
    }

    /// Create a new RuntimeInterface with externally-provided repositories
    ///
    /// This is the preferred way to create a RuntimeInterface. Storage crates
    /// hand over their repository handles; the configuration is validated
    /// before any service is built.
    pub fn create_with_repositories(
        repositories: Repositories,
        config: &CoreConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let ledger = Arc::new(TokenLedger::new(repositories.accounts));
        let graph_store = Arc::new(GraphStore::new(
            repositories.graphs,
            ledger.clone(),
            CostModel::from(&config.pricing),
        ));
        let moderator = Arc::new(WeightUpdateModerator::new(
            graph_store.clone(),
            repositories.requests,
            config.moderation,
        )?);
        let routing = Arc::new(RoutingService::new(
            graph_store.clone(),
            ledger.clone(),
            repositories.trips,
        ));

        tracing::debug!(
            smoothing_factor = config.moderation.smoothing_factor,
            auto_apply_threshold = config.moderation.auto_apply_threshold,
            node_rate = config.pricing.node_rate,
            edge_rate = config.pricing.edge_rate,
            "Runtime interface created"
        );
        Ok(Self::new(graph_store, ledger, moderator, routing))
    }

    /// Validate and store a graph, charging its cost to `owner`
    pub async fn create_graph(&self, owner: &PrincipalId, adjacency: &Value) -> Result<CreatedGraph, CoreError> {
        let graph = self.graph_store.create_graph(owner, adjacency).await?;
        Ok(CreatedGraph {
            graph_id: graph.id,
            cost: graph.cost,
        })
    }

    /// Store a graph without charging its owner
    pub async fn import_graph(&self, owner: &PrincipalId, adjacency: Adjacency) -> Result<CreatedGraph, CoreError> {
        let graph = self.graph_store.import_graph(owner, adjacency).await?;
        Ok(CreatedGraph {
            graph_id: graph.id,
            cost: graph.cost,
        })
    }

    /// Get a graph by ID
    pub async fn get_graph(&self, graph_id: &GraphId) -> Result<Graph, CoreError> {
        self.graph_store.get_graph(graph_id).await
    }

    /// List graphs, optionally for one owner
    pub async fn list_graphs(&self, owner: Option<&PrincipalId>) -> Result<Vec<GraphSummary>, CoreError> {
        self.graph_store.list_graphs(owner).await
    }

    /// Delete a graph
    pub async fn delete_graph(&self, graph_id: &GraphId) -> Result<(), CoreError> {
        self.graph_store.delete_graph(graph_id).await
    }

    /// Run a paid shortest-path search
    pub async fn compute_path(
        &self,
        graph_id: &GraphId,
        executor: &PrincipalId,
        start: &str,
        goal: &str,
    ) -> Result<PathExecution, CoreError> {
        self.routing.compute_path(graph_id, executor, start, goal).await
    }

    /// Propose a new weight for an existing edge
    pub async fn propose_weight_update(
        &self,
        graph_id: &GraphId,
        from: &str,
        to: &str,
        proposed_weight: f64,
        proposer: &PrincipalId,
    ) -> Result<ProposalOutcome, CoreError> {
        self.moderator
            .propose_update(graph_id, from, to, proposed_weight, proposer)
            .await
    }

    /// Resolve a pending weight update request
    pub async fn decide_weight_update(
        &self,
        request_id: &RequestId,
        decision: Decision,
    ) -> Result<DecisionOutcome, CoreError> {
        self.moderator.decide(request_id, decision).await
    }

    /// Resolve a pending request from a textual decision
    pub async fn decide_weight_update_str(
        &self,
        request_id: &RequestId,
        decision: &str,
    ) -> Result<DecisionOutcome, CoreError> {
        let decision: Decision = decision.parse()?;
        self.decide_weight_update(request_id, decision).await
    }

    /// Requests waiting for an arbiter
    pub async fn list_pending_requests(&self) -> Result<Vec<WeightUpdateRequest>, CoreError> {
        self.moderator.pending_requests().await
    }

    /// Every request matching `filter`, oldest first
    pub async fn weight_update_history(&self, filter: HistoryFilter) -> Result<Vec<WeightUpdateRequest>, CoreError> {
        self.moderator.history(&filter.into()).await
    }

    /// Current token balance
    pub async fn get_balance(&self, principal: &PrincipalId) -> Result<f64, CoreError> {
        self.ledger.balance(principal).await
    }

    /// Administrative credit, returning the new balance
    pub async fn refill(&self, principal: &PrincipalId, amount: f64) -> Result<f64, CoreError> {
        let balance = self.ledger.credit(principal, amount).await?;
        tracing::info!(principal = %principal, amount, balance, "Account refilled");
        Ok(balance)
    }

    /// Every token account
    pub async fn list_balances(&self) -> Result<Vec<TokenAccount>, CoreError> {
        self.ledger.accounts().await
    }

    /// Trip history, optionally for one executor
    pub async fn list_trips(&self, executor: Option<&PrincipalId>) -> Result<Vec<TripRecord>, CoreError> {
        self.routing.list_trips(executor).await
    }
}
