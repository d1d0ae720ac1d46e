use serde_json::Value;
use std::sync::Arc;

use crate::{
    application::token_ledger::TokenLedger,
    domain::adjacency::{validate_weight, Adjacency},
    domain::cost_model::CostModel,
    domain::graph::{Graph, GraphId, GraphSummary, PrincipalId},
    domain::repository::GraphRepository,
    CoreError,
};

/// Service for storing graphs and their frozen cost
pub struct GraphStore {
    /// Repository for graphs
    graph_repo: Arc<dyn GraphRepository>,

    /// Ledger charged at creation
    ledger: Arc<TokenLedger>,

    /// Pricing of new graphs
    cost_model: CostModel,
}

impl GraphStore {
    /// Create a new graph store
    pub fn new(
        graph_repo: Arc<dyn GraphRepository>,
        ledger: Arc<TokenLedger>,
        cost_model: CostModel,
    ) -> Self {
        Self {
            graph_repo,
            ledger,
            cost_model,
        }
    }

    /// Pricing used for new graphs
    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Validate an untyped adjacency payload, charge the owner and store the graph
    pub async fn create_graph(&self, owner: &PrincipalId, adjacency: &Value) -> Result<Graph, CoreError> {
        let adjacency = Adjacency::from_json(adjacency)?;
        self.create_graph_from(owner, adjacency).await
    }

    /// Charge the owner for a typed adjacency and store the graph
    pub async fn create_graph_from(
        &self,
        owner: &PrincipalId,
        adjacency: Adjacency,
    ) -> Result<Graph, CoreError> {
        if adjacency.source_count() == 0 {
            return Err(CoreError::InvalidGraph(
                "graph must contain at least one node".to_string(),
            ));
        }

        let cost = self.cost_model.price(&adjacency);
        self.ledger.debit(owner, cost).await?;

        let graph = Graph::new(owner.clone(), adjacency, cost);
        if let Err(e) = self.graph_repo.insert(&graph).await {
            // Hand the tokens back so a failed insert leaves no trace
            tracing::error!(graph_id = %graph.id, owner = %owner, error = %e, "Graph insert failed, refunding");
            if let Err(refund_err) = self.ledger.credit(owner, cost).await {
                tracing::error!(owner = %owner, amount = cost, error = %refund_err, "Refund after failed graph insert did not go through");
            }
            return Err(e);
        }

        metrics::increment_counter!("waypath_graphs_created_total");
        tracing::info!(
            graph_id = %graph.id,
            owner = %owner,
            nodes = graph.adjacency.source_count(),
            edges = graph.adjacency.edge_count(),
            cost,
            "Graph created"
        );
        Ok(graph)
    }

    /// Store a graph without charging anyone, pricing it as usual
    pub async fn import_graph(&self, owner: &PrincipalId, adjacency: Adjacency) -> Result<Graph, CoreError> {
        if adjacency.source_count() == 0 {
            return Err(CoreError::InvalidGraph(
                "graph must contain at least one node".to_string(),
            ));
        }
        let cost = self.cost_model.price(&adjacency);
        let graph = Graph::new(owner.clone(), adjacency, cost);
        self.graph_repo.insert(&graph).await?;

        tracing::info!(graph_id = %graph.id, owner = %owner, cost, "Graph imported");
        Ok(graph)
    }

    /// Get a graph by ID
    pub async fn get_graph(&self, id: &GraphId) -> Result<Graph, CoreError> {
        self.graph_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::GraphNotFound(id.0.clone()))
    }

    /// Overwrite the weight of an existing edge, returning the committed graph
    pub async fn mutate_edge(
        &self,
        id: &GraphId,
        from: &str,
        to: &str,
        weight: f64,
    ) -> Result<Graph, CoreError> {
        let weight = validate_weight(weight)?;
        let (from_node, to_node) = (from.to_string(), to.to_string());
        let graph = self
            .graph_repo
            .update(
                id,
                Box::new(move |graph: &mut Graph| {
                    graph.adjacency.set_weight(&from_node, &to_node, weight)?;
                    Ok(())
                }),
            )
            .await?;

        tracing::debug!(graph_id = %id, from, to, weight, "Edge weight updated");
        Ok(graph)
    }

    /// List graphs, optionally for one owner
    pub async fn list_graphs(&self, owner: Option<&PrincipalId>) -> Result<Vec<GraphSummary>, CoreError> {
        let graphs = self.graph_repo.list(owner).await?;
        Ok(graphs.iter().map(Graph::summary).collect())
    }

    /// Remove a graph; pending requests against it become irresolvable
    pub async fn delete_graph(&self, id: &GraphId) -> Result<(), CoreError> {
        // Surface GraphNotFound instead of silently succeeding
        self.get_graph(id).await?;
        self.graph_repo.delete(id).await?;
        tracing::info!(graph_id = %id, "Graph deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::memory::{MemoryGraphRepository, MemoryTokenAccountRepository};
    use crate::domain::repository::GraphMutation;
    use async_trait::async_trait;
    use serde_json::json;

    fn store() -> (GraphStore, Arc<TokenLedger>) {
        let ledger = Arc::new(TokenLedger::new(Arc::new(MemoryTokenAccountRepository::new())));
        let store = GraphStore::new(
            Arc::new(MemoryGraphRepository::new()),
            ledger.clone(),
            CostModel::default(),
        );
        (store, ledger)
    }

    #[tokio::test]
    async fn test_create_graph_charges_owner() {
        let (store, ledger) = store();
        let alice = PrincipalId::from("alice");
        ledger.credit(&alice, 1.0).await.unwrap();

        let graph = store
            .create_graph(&alice, &json!({"A": {"B": 3, "C": 5}, "B": {"C": 1}}))
            .await
            .unwrap();

        assert_eq!(graph.cost, 0.26);
        assert_eq!(graph.owner, alice);
        assert!((ledger.balance(&alice).await.unwrap() - 0.74).abs() < 1e-9);
        assert_eq!(store.get_graph(&graph.id).await.unwrap(), graph);
    }

    #[tokio::test]
    async fn test_create_graph_without_tokens_leaves_nothing() {
        let (store, ledger) = store();
        let bob = PrincipalId::from("bob");
        ledger.credit(&bob, 0.1).await.unwrap();

        let err = store
            .create_graph(&bob, &json!({"A": {"B": 1}, "B": {"A": 1}}))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::InsufficientTokens { .. }));
        assert!(store.list_graphs(None).await.unwrap().is_empty());
        assert_eq!(ledger.balance(&bob).await.unwrap(), 0.1);
    }

    #[tokio::test]
    async fn test_invalid_graph_is_not_charged() {
        let (store, ledger) = store();
        let alice = PrincipalId::from("alice");
        ledger.credit(&alice, 5.0).await.unwrap();

        let err = store
            .create_graph(&alice, &json!({"A": {"B": -1}}))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidGraph(_)));
        assert_eq!(ledger.balance(&alice).await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn test_mutate_edge() {
        let (store, _) = store();
        let alice = PrincipalId::from("alice");
        let graph = store
            .import_graph(&alice, Adjacency::from_edges([("A", "B", 3.0)]).unwrap())
            .await
            .unwrap();

        let updated = store.mutate_edge(&graph.id, "A", "B", 2.5).await.unwrap();
        assert_eq!(updated.adjacency.weight("A", "B"), Some(2.5));

        assert!(matches!(
            store.mutate_edge(&graph.id, "B", "A", 1.0).await,
            Err(CoreError::EdgeNotFound { .. })
        ));
        assert!(matches!(
            store.mutate_edge(&graph.id, "A", "B", 0.0).await,
            Err(CoreError::InvalidWeight(_))
        ));
        assert!(matches!(
            store.mutate_edge(&GraphId("missing".into()), "A", "B", 1.0).await,
            Err(CoreError::GraphNotFound(_))
        ));

        let stored = store.get_graph(&graph.id).await.unwrap();
        assert_eq!(stored.adjacency.weight("A", "B"), Some(2.5));
        assert_eq!(stored.cost, graph.cost);
    }

    #[tokio::test]
    async fn test_list_graphs_by_owner() {
        let (store, _) = store();
        let alice = PrincipalId::from("alice");
        let bob = PrincipalId::from("bob");
        let single = || Adjacency::from_edges([("A", "B", 1.0)]).unwrap();

        store.import_graph(&alice, single()).await.unwrap();
        store.import_graph(&alice, single()).await.unwrap();
        store.import_graph(&bob, single()).await.unwrap();

        assert_eq!(store.list_graphs(None).await.unwrap().len(), 3);
        let mine = store.list_graphs(Some(&alice)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|summary| summary.owner == alice && summary.cost == 0.12));
    }

    struct BrokenGraphRepository;

    #[async_trait]
    impl GraphRepository for BrokenGraphRepository {
        async fn find_by_id(&self, _id: &GraphId) -> Result<Option<Graph>, CoreError> {
            Ok(None)
        }

        async fn insert(&self, _graph: &Graph) -> Result<(), CoreError> {
            Err(CoreError::StateStoreError("disk full".to_string()))
        }

        async fn update(&self, id: &GraphId, _mutation: GraphMutation) -> Result<Graph, CoreError> {
            Err(CoreError::GraphNotFound(id.0.clone()))
        }

        async fn delete(&self, _id: &GraphId) -> Result<(), CoreError> {
            Ok(())
        }

        async fn list(&self, _owner: Option<&PrincipalId>) -> Result<Vec<Graph>, CoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_insert_refunds_owner() {
        let ledger = Arc::new(TokenLedger::new(Arc::new(MemoryTokenAccountRepository::new())));
        let store = GraphStore::new(Arc::new(BrokenGraphRepository), ledger.clone(), CostModel::default());
        let alice = PrincipalId::from("alice");
        ledger.credit(&alice, 1.0).await.unwrap();

        let err = store
            .create_graph(&alice, &json!({"A": {"B": 1}}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::Internal);
        assert!((ledger.balance(&alice).await.unwrap() - 1.0).abs() < 1e-9);
    }
}
