use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    application::graph_store::GraphStore,
    application::keyed_lock::KeyedLocks,
    config::ModerationConfig,
    domain::adjacency::validate_weight,
    domain::graph::{GraphId, PrincipalId},
    domain::repository::WeightUpdateRequestRepository,
    domain::weight_update::{
        Decision, RequestId, WeightUpdateQuery, WeightUpdateRequest,
    },
    CoreError,
};

/// Result of a weight proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProposalOutcome {
    /// Deviation was within the threshold and the blend was committed
    AutoApplied {
        /// Weight stored on the edge after blending
        new_weight: f64,
    },

    /// Deviation was too large; a pending request awaits an arbiter
    Queued {
        /// The new pending request
        request_id: RequestId,
    },
}

/// Result of an arbiter decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// The proposal was blended into the live weight
    Approved {
        /// The decided request
        request_id: RequestId,
        /// Weight stored on the edge after blending
        new_weight: f64,
    },

    /// The request was closed without touching the graph
    Rejected {
        /// The decided request
        request_id: RequestId,
    },
}

/// Relative deviation of `proposed` from `current`
fn deviation(current: f64, proposed: f64) -> f64 {
    (proposed - current).abs() / current
}

/// Exponential moving average of the live weight and a proposal
fn blend(smoothing_factor: f64, current: f64, proposed: f64) -> f64 {
    smoothing_factor * current + (1.0 - smoothing_factor) * proposed
}

/// State machine for weight-change proposals
///
/// Proposals within `auto_apply_threshold` of the live weight are blended in
/// immediately; larger swings are stored as pending requests for an arbiter.
/// Every read-blend-write on a graph runs inside a per-graph critical section,
/// and every decision inside a per-request one. When both are needed the
/// request lock is always taken first.
pub struct WeightUpdateModerator {
    /// Owner of the graphs being mutated
    graph_store: Arc<GraphStore>,

    /// Repository for weight update requests
    requests: Arc<dyn WeightUpdateRequestRepository>,

    /// Smoothing factor and threshold
    config: ModerationConfig,

    /// Single-writer sections keyed by graph ID
    graph_locks: KeyedLocks,

    /// Single-decider sections keyed by request ID
    request_locks: KeyedLocks,
}

impl WeightUpdateModerator {
    /// Create a new moderator with a validated configuration
    pub fn new(
        graph_store: Arc<GraphStore>,
        requests: Arc<dyn WeightUpdateRequestRepository>,
        config: ModerationConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            graph_store,
            requests,
            config,
            graph_locks: KeyedLocks::new(),
            request_locks: KeyedLocks::new(),
        })
    }

    /// Active moderation settings
    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Propose a new weight for `from -> to`
    pub async fn propose_update(
        &self,
        graph_id: &GraphId,
        from: &str,
        to: &str,
        proposed_weight: f64,
        proposer: &PrincipalId,
    ) -> Result<ProposalOutcome, CoreError> {
        let proposed_weight = validate_weight(proposed_weight)?;

        let guard = self.graph_locks.lock(&graph_id.0).await;
        let result = self
            .propose_locked(graph_id, from, to, proposed_weight, proposer)
            .await;
        drop(guard);
        self.graph_locks.release(&graph_id.0);

        match &result {
            Ok(ProposalOutcome::AutoApplied { new_weight }) => {
                metrics::increment_counter!("waypath_proposals_auto_applied_total");
                tracing::info!(
                    graph_id = %graph_id,
                    from,
                    to,
                    proposed_weight,
                    new_weight,
                    proposer = %proposer,
                    "Weight proposal auto-applied"
                );
            }
            Ok(ProposalOutcome::Queued { request_id }) => {
                metrics::increment_counter!("waypath_proposals_queued_total");
                tracing::info!(
                    graph_id = %graph_id,
                    request_id = %request_id,
                    from,
                    to,
                    proposed_weight,
                    proposer = %proposer,
                    "Weight proposal queued for review"
                );
            }
            Err(e) => {
                tracing::debug!(graph_id = %graph_id, from, to, error = %e, "Weight proposal refused");
            }
        }
        result
    }

    async fn propose_locked(
        &self,
        graph_id: &GraphId,
        from: &str,
        to: &str,
        proposed_weight: f64,
        proposer: &PrincipalId,
    ) -> Result<ProposalOutcome, CoreError> {
        let graph = self.graph_store.get_graph(graph_id).await?;
        let current = graph
            .adjacency
            .weight(from, to)
            .ok_or_else(|| CoreError::EdgeNotFound {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        if deviation(current, proposed_weight) <= self.config.auto_apply_threshold {
            let new_weight = blend(self.config.smoothing_factor, current, proposed_weight);
            self.graph_store
                .mutate_edge(graph_id, from, to, new_weight)
                .await?;
            return Ok(ProposalOutcome::AutoApplied { new_weight });
        }

        let request = WeightUpdateRequest::new(
            graph_id.clone(),
            from,
            to,
            proposed_weight,
            proposer.clone(),
        );
        self.requests.insert(&request).await?;
        Ok(ProposalOutcome::Queued {
            request_id: request.id,
        })
    }

    /// Resolve a pending request exactly once
    pub async fn decide(
        &self,
        request_id: &RequestId,
        decision: Decision,
    ) -> Result<DecisionOutcome, CoreError> {
        let guard = self.request_locks.lock(&request_id.0).await;
        let result = self.decide_locked(request_id, decision).await;
        drop(guard);
        self.request_locks.release(&request_id.0);

        match &result {
            Ok(DecisionOutcome::Approved { new_weight, .. }) => {
                metrics::increment_counter!("waypath_decisions_approved_total");
                tracing::info!(request_id = %request_id, new_weight, "Weight update approved");
            }
            Ok(DecisionOutcome::Rejected { .. }) => {
                metrics::increment_counter!("waypath_decisions_rejected_total");
                tracing::info!(request_id = %request_id, "Weight update rejected");
            }
            Err(e) => {
                tracing::debug!(request_id = %request_id, error = %e, "Decision refused");
            }
        }
        result
    }

    async fn decide_locked(
        &self,
        request_id: &RequestId,
        decision: Decision,
    ) -> Result<DecisionOutcome, CoreError> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| CoreError::RequestNotFound(request_id.0.clone()))?;
        request.ensure_pending()?;

        match decision {
            Decision::Rejected => {
                self.resolve(request_id, decision).await?;
                Ok(DecisionOutcome::Rejected {
                    request_id: request_id.clone(),
                })
            }
            Decision::Approved => {
                let guard = self.graph_locks.lock(&request.graph_id.0).await;
                let result = self.approve_locked(&request).await;
                drop(guard);
                self.graph_locks.release(&request.graph_id.0);
                result
            }
        }
    }

    async fn approve_locked(&self, request: &WeightUpdateRequest) -> Result<DecisionOutcome, CoreError> {
        // Blend against the weight as it is now, not as it was when proposed
        let graph = self.graph_store.get_graph(&request.graph_id).await?;
        let current = graph
            .adjacency
            .weight(&request.from, &request.to)
            .ok_or_else(|| CoreError::EdgeNotFound {
                from: request.from.clone(),
                to: request.to.clone(),
            })?;

        let new_weight = blend(self.config.smoothing_factor, current, request.proposed_weight);
        self.graph_store
            .mutate_edge(&request.graph_id, &request.from, &request.to, new_weight)
            .await?;

        if let Err(e) = self.resolve(&request.id, Decision::Approved).await {
            tracing::error!(
                request_id = %request.id,
                graph_id = %request.graph_id,
                error = %e,
                "Status update failed after mutation, restoring previous weight"
            );
            if let Err(restore_err) = self
                .graph_store
                .mutate_edge(&request.graph_id, &request.from, &request.to, current)
                .await
            {
                tracing::error!(
                    request_id = %request.id,
                    graph_id = %request.graph_id,
                    error = %restore_err,
                    "Previous weight could not be restored"
                );
            }
            return Err(e);
        }

        Ok(DecisionOutcome::Approved {
            request_id: request.id.clone(),
            new_weight,
        })
    }

    async fn resolve(&self, request_id: &RequestId, decision: Decision) -> Result<WeightUpdateRequest, CoreError> {
        self.requests
            .update(
                request_id,
                Box::new(move |request: &mut WeightUpdateRequest| request.resolve(decision)),
            )
            .await
    }

    /// Requests still waiting for an arbiter, oldest first
    pub async fn pending_requests(&self) -> Result<Vec<WeightUpdateRequest>, CoreError> {
        self.requests.find(&WeightUpdateQuery::pending()).await
    }

    /// Requests of any status matching `query`, oldest first
    pub async fn history(&self, query: &WeightUpdateQuery) -> Result<Vec<WeightUpdateRequest>, CoreError> {
        self.requests.find(query).await
    }

    /// Look up a single request
    pub async fn get_request(&self, request_id: &RequestId) -> Result<WeightUpdateRequest, CoreError> {
        self.requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| CoreError::RequestNotFound(request_id.0.clone()))
    }
}
