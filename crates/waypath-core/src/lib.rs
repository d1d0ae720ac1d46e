//!
//! Waypath Core - metered shortest-path routing over weighted graphs
//!
//! This crate defines the domain model, the application services and the
//! [`RuntimeInterface`] through which a transport layer drives them: storing
//! priced graphs, charging tokens for path searches, and moderating proposed
//! edge weight changes. Storage is reached only through the repository traits
//! in [`domain::repository`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - graph model, pricing, path search and records
pub mod domain;

/// Application services - ledger, graph store, moderation and routing
pub mod application;

/// Runtime configuration
pub mod config;

/// Error types
pub mod error;

// Re-export key types
pub use config::{CoreConfig, ModerationConfig, PricingConfig};
pub use error::{CoreError, ErrorKind};

// Application interfaces
pub use application::moderator::{DecisionOutcome, ProposalOutcome};
pub use application::routing_service::PathExecution;
pub use application::runtime_interface::{CreatedGraph, HistoryFilter, Repositories, RuntimeInterface};

// Re-export main API types for easy use
pub use domain::adjacency::{Adjacency, AdjacencyMap};
pub use domain::cost_model::CostModel;
pub use domain::graph::{Graph, GraphId, GraphSummary, PrincipalId};
pub use domain::path_finder::PathResult;
pub use domain::repository::{
    GraphRepository, TokenAccountRepository, TripRepository, WeightUpdateRequestRepository,
};
pub use domain::token_account::TokenAccount;
pub use domain::trip::{TripId, TripRecord};
pub use domain::weight_update::{
    Decision, RequestId, RequestStatus, WeightUpdateQuery, WeightUpdateRequest,
};
