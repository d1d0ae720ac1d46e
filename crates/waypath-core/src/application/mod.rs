/// Graph storage and pricing at creation
pub mod graph_store;

/// Per-key async critical sections
pub mod keyed_lock;

/// Weight update moderation
pub mod moderator;

/// Paid path execution and trip history
pub mod routing_service;

/// Runtime interface for external systems
pub mod runtime_interface;

/// Token balances
pub mod token_ledger;
