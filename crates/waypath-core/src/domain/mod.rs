//! Domain layer: graph model, pricing, path search, moderation and ledger records

/// Typed adjacency arena
pub mod adjacency;

/// Graph pricing
pub mod cost_model;

/// Graph aggregate and identifiers
pub mod graph;

/// Shortest-path search
pub mod path_finder;

/// Persistence seams
pub mod repository;

/// Token account aggregate
pub mod token_account;

/// Trip history records
pub mod trip;

/// Weight update requests and their state machine
pub mod weight_update;
