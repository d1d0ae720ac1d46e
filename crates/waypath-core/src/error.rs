use std::fmt;

use thiserror::Error;

/// Core error type for the Waypath runtime
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Adjacency input is malformed, empty or carries a non-positive weight
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Graph not found
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    /// Node is not part of the graph
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Edge is not part of the graph
    #[error("Edge not found: {from} -> {to}")]
    EdgeNotFound {
        /// Source node
        from: String,
        /// Destination node
        to: String,
    },

    /// Goal is unreachable from start
    #[error("No path exists from {start} to {goal}")]
    NoPathExists {
        /// Start node
        start: String,
        /// Goal node
        goal: String,
    },

    /// Weight is not a finite positive number
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    /// Token amount is not a finite non-negative number
    #[error("Invalid token amount: {0}")]
    InvalidAmount(String),

    /// Balance too low for the requested debit
    #[error("Insufficient tokens for {principal}: required {required}, available {available}")]
    InsufficientTokens {
        /// Principal being charged
        principal: String,
        /// Amount that was requested
        required: f64,
        /// Balance at the time of the request
        available: f64,
    },

    /// Weight update request not found
    #[error("Weight update request not found: {0}")]
    RequestNotFound(String),

    /// Weight update request already left the pending state
    #[error("Weight update request {id} already {status}")]
    AlreadyDecided {
        /// Request ID
        id: String,
        /// Terminal status of the request
        status: String,
    },

    /// Decision outside of approved/rejected
    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// State store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Stable, machine-readable classification of a [`CoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CoreError::InvalidGraph`]
    InvalidGraph,
    /// See [`CoreError::GraphNotFound`]
    GraphNotFound,
    /// See [`CoreError::NodeNotFound`]
    NodeNotFound,
    /// See [`CoreError::EdgeNotFound`]
    EdgeNotFound,
    /// See [`CoreError::NoPathExists`]
    NoPathExists,
    /// See [`CoreError::InvalidWeight`]
    InvalidWeight,
    /// See [`CoreError::InvalidAmount`]
    InvalidAmount,
    /// See [`CoreError::InsufficientTokens`]
    InsufficientTokens,
    /// See [`CoreError::RequestNotFound`]
    RequestNotFound,
    /// See [`CoreError::AlreadyDecided`]
    AlreadyDecided,
    /// See [`CoreError::InvalidDecision`]
    InvalidDecision,
    /// See [`CoreError::ConfigurationError`]
    Configuration,
    /// Store, serialization and other unexpected failures
    Internal,
}

impl ErrorKind {
    /// Wire code for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidGraph => "INVALID_GRAPH",
            ErrorKind::GraphNotFound => "GRAPH_NOT_FOUND",
            ErrorKind::NodeNotFound => "NODE_NOT_FOUND",
            ErrorKind::EdgeNotFound => "EDGE_NOT_FOUND",
            ErrorKind::NoPathExists => "NO_PATH_EXISTS",
            ErrorKind::InvalidWeight => "INVALID_WEIGHT",
            ErrorKind::InvalidAmount => "INVALID_AMOUNT",
            ErrorKind::InsufficientTokens => "INSUFFICIENT_TOKENS",
            ErrorKind::RequestNotFound => "REQUEST_NOT_FOUND",
            ErrorKind::AlreadyDecided => "ALREADY_DECIDED",
            ErrorKind::InvalidDecision => "INVALID_DECISION",
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoreError {
    /// Machine-readable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidGraph(_) => ErrorKind::InvalidGraph,
            CoreError::GraphNotFound(_) => ErrorKind::GraphNotFound,
            CoreError::NodeNotFound(_) => ErrorKind::NodeNotFound,
            CoreError::EdgeNotFound { .. } => ErrorKind::EdgeNotFound,
            CoreError::NoPathExists { .. } => ErrorKind::NoPathExists,
            CoreError::InvalidWeight(_) => ErrorKind::InvalidWeight,
            CoreError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            CoreError::InsufficientTokens { .. } => ErrorKind::InsufficientTokens,
            CoreError::RequestNotFound(_) => ErrorKind::RequestNotFound,
            CoreError::AlreadyDecided { .. } => ErrorKind::AlreadyDecided,
            CoreError::InvalidDecision(_) => ErrorKind::InvalidDecision,
            CoreError::ConfigurationError(_) => ErrorKind::Configuration,
            CoreError::StateStoreError(_)
            | CoreError::SerializationError(_)
            | CoreError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error belongs to the domain taxonomy rather than an
    /// infrastructure failure
    pub fn is_domain_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal | ErrorKind::Configuration)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (CoreError::InvalidGraph("empty".to_string()), "Invalid graph: empty"),
            (CoreError::GraphNotFound("g1".to_string()), "Graph not found: g1"),
            (CoreError::NodeNotFound("Z".to_string()), "Node not found: Z"),
            (
                CoreError::EdgeNotFound { from: "A".to_string(), to: "B".to_string() },
                "Edge not found: A -> B",
            ),
            (
                CoreError::NoPathExists { start: "A".to_string(), goal: "D".to_string() },
                "No path exists from A to D",
            ),
            (
                CoreError::InsufficientTokens {
                    principal: "alice".to_string(),
                    required: 1.5,
                    available: 0.25,
                },
                "Insufficient tokens for alice: required 1.5, available 0.25",
            ),
            (
                CoreError::AlreadyDecided { id: "r1".to_string(), status: "approved".to_string() },
                "Weight update request r1 already approved",
            ),
            (CoreError::Other("other_err".to_string()), "other_err"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(CoreError::InvalidGraph(String::new()).kind().as_str(), "INVALID_GRAPH");
        assert_eq!(CoreError::InvalidDecision("maybe".into()).kind().as_str(), "INVALID_DECISION");
        assert_eq!(CoreError::StateStoreError("down".into()).kind(), ErrorKind::Internal);
        assert_eq!(CoreError::SerializationError("bad".into()).kind(), ErrorKind::Internal);
        assert!(CoreError::RequestNotFound("r".into()).is_domain_error());
        assert!(!CoreError::StateStoreError("down".into()).is_domain_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: CoreError = json_error.into();

        match error {
            CoreError::SerializationError(msg) => {
                assert!(msg.contains("expected value"));
            }
            _ => panic!("Expected SerializationError variant"),
        }
    }

    #[test]
    fn test_from_str() {
        let error: CoreError = "test error message".into();
        assert_eq!(error, CoreError::Other("test error message".to_string()));
    }
}
