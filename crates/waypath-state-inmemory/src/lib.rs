//! In-memory state store implementation for Waypath
//!
//! This crate provides in-memory implementations of the repository
//! interfaces defined in the waypath-core crate. It is the store used by the
//! server binary and by tests; nothing survives a restart.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod repositories;
pub use repositories::{
    InMemoryGraphRepository, InMemoryTokenAccountRepository, InMemoryTripRepository,
    InMemoryWeightUpdateRequestRepository,
};

use waypath_core::{
    Graph, Repositories, TokenAccount, TripRecord, WeightUpdateRequest,
};

/// Provider for in-memory state store repositories
///
/// Every repository handed out by one provider shares the same maps, so a
/// provider can be asked for repositories more than once.
#[derive(Clone)]
pub struct InMemoryStateStoreProvider {
    // Shared storage for graphs
    graphs: Arc<RwLock<HashMap<String, Graph>>>,

    // Shared storage for token accounts
    accounts: Arc<RwLock<HashMap<String, TokenAccount>>>,

    // Shared storage for weight update requests
    requests: Arc<RwLock<HashMap<String, WeightUpdateRequest>>>,

    // Append-only trip log
    trips: Arc<RwLock<Vec<TripRecord>>>,
}

impl InMemoryStateStoreProvider {
    /// Create a new in-memory state store provider
    pub fn new() -> Self {
        Self {
            graphs: Arc::new(RwLock::new(HashMap::new())),
            accounts: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(HashMap::new())),
            trips: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create repositories for use with RuntimeInterface
    pub fn create_repositories(&self) -> Repositories {
        Repositories {
            graphs: Arc::new(InMemoryGraphRepository::new(self.graphs.clone())),
            accounts: Arc::new(InMemoryTokenAccountRepository::new(self.accounts.clone())),
            requests: Arc::new(InMemoryWeightUpdateRequestRepository::new(
                self.requests.clone(),
            )),
            trips: Arc::new(InMemoryTripRepository::new(self.trips.clone())),
        }
    }

    /// Record counts, for startup and shutdown logging
    pub async fn stats(&self) -> StoreStats {
        StoreStats {
            graphs: self.graphs.read().await.len(),
            accounts: self.accounts.read().await.len(),
            requests: self.requests.read().await.len(),
            trips: self.trips.read().await.len(),
        }
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of records held by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Stored graphs
    pub graphs: usize,
    /// Known token accounts
    pub accounts: usize,
    /// Weight update requests of any status
    pub requests: usize,
    /// Recorded trips
    pub trips: usize,
}

#[cfg(test)]
mod tests;
