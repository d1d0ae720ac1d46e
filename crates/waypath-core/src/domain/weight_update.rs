use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::graph::{GraphId, PrincipalId};
use crate::CoreError;

/// Value object: Weight update request ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Weight update request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for an arbiter
    Pending,

    /// Applied to the graph
    Approved,

    /// Discarded without touching the graph
    Rejected,
}

impl RequestStatus {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arbiter verdict on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Blend the proposal into the live weight
    Approved,

    /// Close the request without mutation
    Rejected,
}

impl FromStr for Decision {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            _ => Err(CoreError::InvalidDecision(format!(
                "expected 'approved' or 'rejected', got '{}'",
                value
            ))),
        }
    }
}

/// Aggregate: proposed weight change awaiting arbitration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightUpdateRequest {
    /// Unique identifier
    pub id: RequestId,

    /// Target graph
    pub graph_id: GraphId,

    /// Source node of the edge
    pub from: String,

    /// Destination node of the edge
    pub to: String,

    /// Weight suggested by the proposer
    pub proposed_weight: f64,

    /// Principal that filed the proposal
    pub proposer: PrincipalId,

    /// Current status
    pub status: RequestStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When the request left the pending state
    pub decided_at: Option<DateTime<Utc>>,
}

impl WeightUpdateRequest {
    /// Create a new pending request
    pub fn new(
        graph_id: GraphId,
        from: impl Into<String>,
        to: impl Into<String>,
        proposed_weight: f64,
        proposer: PrincipalId,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            graph_id,
            from: from.into(),
            to: to.into(),
            proposed_weight,
            proposer,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        }
    }

    /// Still waiting for a decision
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Fail unless the request is pending
    pub fn ensure_pending(&self) -> Result<(), CoreError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CoreError::AlreadyDecided {
                id: self.id.0.clone(),
                status: self.status.to_string(),
            })
        }
    }

    /// Move to the terminal state matching `decision`
    pub fn resolve(&mut self, decision: Decision) -> Result<(), CoreError> {
        self.ensure_pending()?;
        self.status = match decision {
            Decision::Approved => RequestStatus::Approved,
            Decision::Rejected => RequestStatus::Rejected,
        };
        self.decided_at = Some(Utc::now());
        Ok(())
    }
}

/// Filter over stored weight update requests
///
/// Time bounds are inclusive. An empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightUpdateQuery {
    /// Only requests against this graph
    pub graph_id: Option<GraphId>,

    /// Only requests in this status
    pub status: Option<RequestStatus>,

    /// Created at or after
    pub created_from: Option<DateTime<Utc>>,

    /// Created at or before
    pub created_to: Option<DateTime<Utc>>,
}

impl WeightUpdateQuery {
    /// Query for every pending request
    pub fn pending() -> Self {
        Self {
            status: Some(RequestStatus::Pending),
            ..Self::default()
        }
    }

    /// Whether `request` passes every filter
    pub fn matches(&self, request: &WeightUpdateRequest) -> bool {
        self.graph_id.as_ref().map_or(true, |id| *id == request.graph_id)
            && self.status.map_or(true, |status| status == request.status)
            && self.created_from.map_or(true, |from| request.created_at >= from)
            && self.created_to.map_or(true, |to| request.created_at <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> WeightUpdateRequest {
        WeightUpdateRequest::new(
            GraphId("g1".to_string()),
            "A",
            "B",
            20.0,
            PrincipalId::from("bob"),
        )
    }

    #[test]
    fn test_resolve_once() {
        let mut request = request();
        assert!(request.is_pending());

        request.resolve(Decision::Approved).unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert!(request.decided_at.is_some());

        let err = request.resolve(Decision::Rejected).unwrap_err();
        assert_eq!(
            err,
            CoreError::AlreadyDecided {
                id: request.id.0.clone(),
                status: "approved".to_string()
            }
        );
        assert_eq!(request.status, RequestStatus::Approved);
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!("approved".parse::<Decision>().unwrap(), Decision::Approved);
        assert_eq!(" Rejected ".parse::<Decision>().unwrap(), Decision::Rejected);
        assert!(matches!(
            "maybe".parse::<Decision>(),
            Err(CoreError::InvalidDecision(_))
        ));
    }

    #[test]
    fn test_query_matching() {
        let request = request();

        assert!(WeightUpdateQuery::default().matches(&request));
        assert!(WeightUpdateQuery::pending().matches(&request));

        let other_graph = WeightUpdateQuery {
            graph_id: Some(GraphId("g2".to_string())),
            ..Default::default()
        };
        assert!(!other_graph.matches(&request));

        let window = WeightUpdateQuery {
            created_from: Some(request.created_at - Duration::minutes(1)),
            created_to: Some(request.created_at),
            ..Default::default()
        };
        assert!(window.matches(&request));

        let future = WeightUpdateQuery {
            created_from: Some(request.created_at + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!future.matches(&request));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let value = serde_json::to_value(RequestStatus::Pending).unwrap();
        assert_eq!(value, serde_json::json!("pending"));
    }
}
