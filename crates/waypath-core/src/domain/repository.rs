//! Repository traits for the Waypath core
//!
//! This module defines the persistence seams used by the application
//! services. External crates implement these traits to plug in a storage
//! technology. Every `update*` method is an atomic read-modify-write on a
//! single key: the mutation runs against the current record and is committed
//! only if it returns `Ok`, with no other writer to the same key interleaving.

use async_trait::async_trait;

use super::graph::{Graph, GraphId, PrincipalId};
use super::token_account::TokenAccount;
use super::trip::TripRecord;
use super::weight_update::{RequestId, WeightUpdateQuery, WeightUpdateRequest};
use crate::CoreError;

/// In-place change to a stored graph
pub type GraphMutation = Box<dyn FnOnce(&mut Graph) -> Result<(), CoreError> + Send>;

/// In-place change to a token account
pub type AccountMutation = Box<dyn FnOnce(&mut TokenAccount) -> Result<(), CoreError> + Send>;

/// In-place change to a weight update request
pub type RequestMutation = Box<dyn FnOnce(&mut WeightUpdateRequest) -> Result<(), CoreError> + Send>;

/// Repository for graphs
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Find a graph by ID
    async fn find_by_id(&self, id: &GraphId) -> Result<Option<Graph>, CoreError>;

    /// Store a new graph
    async fn insert(&self, graph: &Graph) -> Result<(), CoreError>;

    /// Atomically mutate a graph, returning the committed record.
    /// Fails with `GraphNotFound` if the graph does not exist.
    async fn update(&self, id: &GraphId, mutation: GraphMutation) -> Result<Graph, CoreError>;

    /// Delete a graph
    async fn delete(&self, id: &GraphId) -> Result<(), CoreError>;

    /// List graphs, optionally restricted to one owner
    async fn list(&self, owner: Option<&PrincipalId>) -> Result<Vec<Graph>, CoreError>;
}

/// Repository for token accounts
#[async_trait]
pub trait TokenAccountRepository: Send + Sync {
    /// Find an account
    async fn find(&self, principal: &PrincipalId) -> Result<Option<TokenAccount>, CoreError>;

    /// Atomically mutate an account, returning the committed record.
    /// A missing account is presented to the mutation as an empty one and
    /// only stored if the mutation succeeds.
    async fn update(
        &self,
        principal: &PrincipalId,
        mutation: AccountMutation,
    ) -> Result<TokenAccount, CoreError>;

    /// List every account
    async fn list(&self) -> Result<Vec<TokenAccount>, CoreError>;
}

/// Repository for weight update requests
#[async_trait]
pub trait WeightUpdateRequestRepository: Send + Sync {
    /// Find a request by ID
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<WeightUpdateRequest>, CoreError>;

    /// Store a new request
    async fn insert(&self, request: &WeightUpdateRequest) -> Result<(), CoreError>;

    /// Atomically mutate a request, returning the committed record.
    /// Fails with `RequestNotFound` if the request does not exist.
    async fn update(
        &self,
        id: &RequestId,
        mutation: RequestMutation,
    ) -> Result<WeightUpdateRequest, CoreError>;

    /// Requests matching `query`, oldest first
    async fn find(&self, query: &WeightUpdateQuery) -> Result<Vec<WeightUpdateRequest>, CoreError>;
}

/// Repository for trip history
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Append a trip
    async fn insert(&self, trip: &TripRecord) -> Result<(), CoreError>;

    /// Trips, optionally restricted to one executor, oldest first
    async fn list(&self, executor: Option<&PrincipalId>) -> Result<Vec<TripRecord>, CoreError>;
}

/// Memory implementations for testing
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use dashmap::mapref::entry::Entry;
    use dashmap::DashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory graph repository backed by a concurrent map; updates hold the
    /// shard lock for the key while the mutation runs
    #[derive(Default)]
    pub struct MemoryGraphRepository {
        graphs: Arc<DashMap<String, Graph>>,
    }

    impl MemoryGraphRepository {
        /// Create a new memory graph repository
        pub fn new() -> Self {
            Self {
                graphs: Arc::new(DashMap::with_capacity(16)),
            }
        }
    }

    #[async_trait]
    impl GraphRepository for MemoryGraphRepository {
        async fn find_by_id(&self, id: &GraphId) -> Result<Option<Graph>, CoreError> {
            Ok(self.graphs.get(&id.0).map(|graph| graph.clone()))
        }

        async fn insert(&self, graph: &Graph) -> Result<(), CoreError> {
            self.graphs.insert(graph.id.0.clone(), graph.clone());
            Ok(())
        }

        async fn update(&self, id: &GraphId, mutation: GraphMutation) -> Result<Graph, CoreError> {
            let mut entry = self
                .graphs
                .get_mut(&id.0)
                .ok_or_else(|| CoreError::GraphNotFound(id.0.clone()))?;
            let mut updated = entry.clone();
            mutation(&mut updated)?;
            *entry = updated.clone();
            Ok(updated)
        }

        async fn delete(&self, id: &GraphId) -> Result<(), CoreError> {
            self.graphs.remove(&id.0);
            Ok(())
        }

        async fn list(&self, owner: Option<&PrincipalId>) -> Result<Vec<Graph>, CoreError> {
            let mut graphs: Vec<Graph> = self
                .graphs
                .iter()
                .filter(|graph| owner.map_or(true, |owner| graph.owner == *owner))
                .map(|graph| graph.clone())
                .collect();
            graphs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(graphs)
        }
    }

    /// In-memory token account repository
    #[derive(Default)]
    pub struct MemoryTokenAccountRepository {
        accounts: Arc<DashMap<String, TokenAccount>>,
    }

    impl MemoryTokenAccountRepository {
        /// Create a new memory token account repository
        pub fn new() -> Self {
            Self {
                accounts: Arc::new(DashMap::with_capacity(16)),
            }
        }
    }

    #[async_trait]
    impl TokenAccountRepository for MemoryTokenAccountRepository {
        async fn find(&self, principal: &PrincipalId) -> Result<Option<TokenAccount>, CoreError> {
            Ok(self.accounts.get(&principal.0).map(|account| account.clone()))
        }

        async fn update(
            &self,
            principal: &PrincipalId,
            mutation: AccountMutation,
        ) -> Result<TokenAccount, CoreError> {
            // The entry keeps the shard locked until the match arm finishes
            match self.accounts.entry(principal.0.clone()) {
                Entry::Occupied(mut entry) => {
                    let mut updated = entry.get().clone();
                    mutation(&mut updated)?;
                    entry.insert(updated.clone());
                    Ok(updated)
                }
                Entry::Vacant(entry) => {
                    let mut created = TokenAccount::empty(principal.clone());
                    mutation(&mut created)?;
                    entry.insert(created.clone());
                    Ok(created)
                }
            }
        }

        async fn list(&self) -> Result<Vec<TokenAccount>, CoreError> {
            let mut accounts: Vec<TokenAccount> =
                self.accounts.iter().map(|account| account.clone()).collect();
            accounts.sort_by(|a, b| a.principal.cmp(&b.principal));
            Ok(accounts)
        }
    }

    /// In-memory weight update request repository
    #[derive(Default)]
    pub struct MemoryWeightUpdateRequestRepository {
        requests: Arc<DashMap<String, WeightUpdateRequest>>,
    }

    impl MemoryWeightUpdateRequestRepository {
        /// Create a new memory request repository
        pub fn new() -> Self {
            Self {
                requests: Arc::new(DashMap::with_capacity(16)),
            }
        }
    }

    #[async_trait]
    impl WeightUpdateRequestRepository for MemoryWeightUpdateRequestRepository {
        async fn find_by_id(
            &self,
            id: &RequestId,
        ) -> Result<Option<WeightUpdateRequest>, CoreError> {
            Ok(self.requests.get(&id.0).map(|request| request.clone()))
        }

        async fn insert(&self, request: &WeightUpdateRequest) -> Result<(), CoreError> {
            self.requests.insert(request.id.0.clone(), request.clone());
            Ok(())
        }

        async fn update(
            &self,
            id: &RequestId,
            mutation: RequestMutation,
        ) -> Result<WeightUpdateRequest, CoreError> {
            let mut entry = self
                .requests
                .get_mut(&id.0)
                .ok_or_else(|| CoreError::RequestNotFound(id.0.clone()))?;
            let mut updated = entry.clone();
            mutation(&mut updated)?;
            *entry = updated.clone();
            Ok(updated)
        }

        async fn find(
            &self,
            query: &WeightUpdateQuery,
        ) -> Result<Vec<WeightUpdateRequest>, CoreError> {
            let mut requests: Vec<WeightUpdateRequest> = self
                .requests
                .iter()
                .filter(|request| query.matches(request))
                .map(|request| request.clone())
                .collect();
            requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(requests)
        }
    }

    /// In-memory append-only trip log
    #[derive(Default)]
    pub struct MemoryTripRepository {
        trips: Arc<Mutex<Vec<TripRecord>>>,
    }

    impl MemoryTripRepository {
        /// Create a new memory trip repository
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl TripRepository for MemoryTripRepository {
        async fn insert(&self, trip: &TripRecord) -> Result<(), CoreError> {
            self.trips
                .lock()
                .map_err(|e| CoreError::StateStoreError(e.to_string()))?
                .push(trip.clone());
            Ok(())
        }

        async fn list(&self, executor: Option<&PrincipalId>) -> Result<Vec<TripRecord>, CoreError> {
            let trips = self
                .trips
                .lock()
                .map_err(|e| CoreError::StateStoreError(e.to_string()))?;
            Ok(trips
                .iter()
                .filter(|trip| executor.map_or(true, |executor| trip.executor == *executor))
                .cloned()
                .collect())
        }
    }
}
