use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use waypath_core::{
    domain::repository::{AccountMutation, GraphMutation, RequestMutation},
    CoreError, Graph, GraphId, GraphRepository, PrincipalId, RequestId, TokenAccount,
    TokenAccountRepository, TripRecord, TripRepository, WeightUpdateQuery, WeightUpdateRequest,
    WeightUpdateRequestRepository,
};

/// In-memory implementation of the GraphRepository
///
/// `update` holds the write lock while the mutation runs, which makes the
/// read-modify-write atomic with respect to every other writer.
pub struct InMemoryGraphRepository {
    graphs: Arc<RwLock<HashMap<String, Graph>>>,
}

impl InMemoryGraphRepository {
    /// Create a new in-memory graph repository
    pub fn new(graphs: Arc<RwLock<HashMap<String, Graph>>>) -> Self {
        Self { graphs }
    }
}

#[async_trait]
impl GraphRepository for InMemoryGraphRepository {
    async fn find_by_id(&self, id: &GraphId) -> Result<Option<Graph>, CoreError> {
        let graphs = self.graphs.read().await;
        Ok(graphs.get(&id.0).cloned())
    }

    async fn insert(&self, graph: &Graph) -> Result<(), CoreError> {
        let mut graphs = self.graphs.write().await;
        if graphs.contains_key(&graph.id.0) {
            return Err(CoreError::StateStoreError(format!(
                "graph {} already exists",
                graph.id
            )));
        }
        graphs.insert(graph.id.0.clone(), graph.clone());
        debug!(graph_id = %graph.id, "Stored graph");
        Ok(())
    }

    async fn update(&self, id: &GraphId, mutation: GraphMutation) -> Result<Graph, CoreError> {
        let mut graphs = self.graphs.write().await;
        let stored = graphs
            .get_mut(&id.0)
            .ok_or_else(|| CoreError::GraphNotFound(id.0.clone()))?;

        // Mutate a copy so a failed mutation leaves the record untouched
        let mut updated = stored.clone();
        mutation(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &GraphId) -> Result<(), CoreError> {
        let mut graphs = self.graphs.write().await;
        graphs.remove(&id.0);
        Ok(())
    }

    async fn list(&self, owner: Option<&PrincipalId>) -> Result<Vec<Graph>, CoreError> {
        let graphs = self.graphs.read().await;
        let mut result: Vec<Graph> = graphs
            .values()
            .filter(|graph| match owner {
                Some(owner) => graph.owner == *owner,
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }
}

/// In-memory implementation of the TokenAccountRepository
pub struct InMemoryTokenAccountRepository {
    accounts: Arc<RwLock<HashMap<String, TokenAccount>>>,
}

impl InMemoryTokenAccountRepository {
    /// Create a new in-memory token account repository
    pub fn new(accounts: Arc<RwLock<HashMap<String, TokenAccount>>>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl TokenAccountRepository for InMemoryTokenAccountRepository {
    async fn find(&self, principal: &PrincipalId) -> Result<Option<TokenAccount>, CoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&principal.0).cloned())
    }

    async fn update(
        &self,
        principal: &PrincipalId,
        mutation: AccountMutation,
    ) -> Result<TokenAccount, CoreError> {
        let mut accounts = self.accounts.write().await;
        let mut updated = accounts
            .get(&principal.0)
            .cloned()
            .unwrap_or_else(|| TokenAccount::empty(principal.clone()));

        // Nothing is stored, not even a new empty account, unless the mutation succeeds
        mutation(&mut updated)?;
        accounts.insert(principal.0.clone(), updated.clone());
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<TokenAccount>, CoreError> {
        let accounts = self.accounts.read().await;
        let mut result: Vec<TokenAccount> = accounts.values().cloned().collect();
        result.sort_by(|a, b| a.principal.cmp(&b.principal));
        Ok(result)
    }
}

/// In-memory implementation of the WeightUpdateRequestRepository
pub struct InMemoryWeightUpdateRequestRepository {
    requests: Arc<RwLock<HashMap<String, WeightUpdateRequest>>>,
}

impl InMemoryWeightUpdateRequestRepository {
    /// Create a new in-memory request repository
    pub fn new(requests: Arc<RwLock<HashMap<String, WeightUpdateRequest>>>) -> Self {
        Self { requests }
    }
}

#[async_trait]
impl WeightUpdateRequestRepository for InMemoryWeightUpdateRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<WeightUpdateRequest>, CoreError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn insert(&self, request: &WeightUpdateRequest) -> Result<(), CoreError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request.clone());
        debug!(request_id = %request.id, graph_id = %request.graph_id, "Stored weight update request");
        Ok(())
    }

    async fn update(
        &self,
        id: &RequestId,
        mutation: RequestMutation,
    ) -> Result<WeightUpdateRequest, CoreError> {
        let mut requests = self.requests.write().await;
        let stored = requests
            .get_mut(&id.0)
            .ok_or_else(|| CoreError::RequestNotFound(id.0.clone()))?;

        let mut updated = stored.clone();
        mutation(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn find(&self, query: &WeightUpdateQuery) -> Result<Vec<WeightUpdateRequest>, CoreError> {
        let requests = self.requests.read().await;
        let mut result: Vec<WeightUpdateRequest> = requests
            .values()
            .filter(|request| query.matches(request))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(result)
    }
}

/// In-memory implementation of the TripRepository
pub struct InMemoryTripRepository {
    trips: Arc<RwLock<Vec<TripRecord>>>,
}

impl InMemoryTripRepository {
    /// Create a new in-memory trip repository
    pub fn new(trips: Arc<RwLock<Vec<TripRecord>>>) -> Self {
        Self { trips }
    }
}

#[async_trait]
impl TripRepository for InMemoryTripRepository {
    async fn insert(&self, trip: &TripRecord) -> Result<(), CoreError> {
        let mut trips = self.trips.write().await;
        trips.push(trip.clone());
        Ok(())
    }

    async fn list(&self, executor: Option<&PrincipalId>) -> Result<Vec<TripRecord>, CoreError> {
        let trips = self.trips.read().await;
        Ok(trips
            .iter()
            .filter(|trip| match executor {
                Some(executor) => trip.executor == *executor,
                None => true,
            })
            .cloned()
            .collect())
    }
}
