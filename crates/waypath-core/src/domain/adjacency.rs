//! Typed adjacency structure
//!
//! Nodes live in an arena and are addressed by [`NodeId`] handles. Outgoing
//! edges are stored per node in insertion order, and an `(from, to)` index
//! gives constant-time weight lookup and update.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::CoreError;

/// Nested map form of an adjacency, as exchanged with callers
pub type AdjacencyMap = BTreeMap<String, BTreeMap<String, f64>>;

/// Handle of a node inside an [`Adjacency`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Directed, weighted edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Destination node
    pub to: NodeId,
    /// Strictly positive weight
    pub weight: f64,
}

/// Directed graph with strictly positive edge weights
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "AdjacencyMap")]
pub struct Adjacency {
    names: Vec<String>,
    lookup: HashMap<String, NodeId>,
    is_source: Vec<bool>,
    out: Vec<Vec<Edge>>,
    slots: HashMap<(NodeId, NodeId), usize>,
    edge_count: usize,
}

/// Reject anything that is not a finite number greater than zero
pub fn validate_weight(weight: f64) -> Result<f64, CoreError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(CoreError::InvalidWeight(format!(
            "weight must be a finite number greater than zero, got {}",
            weight
        )))
    }
}

impl Adjacency {
    /// Create an empty adjacency
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an untyped `{ node: { neighbour: weight } }` payload
    pub fn from_json(value: &Value) -> Result<Self, CoreError> {
        let sources = value.as_object().ok_or_else(|| {
            CoreError::InvalidGraph(
                "adjacency must be an object mapping node names to neighbour maps".to_string(),
            )
        })?;

        let mut adjacency = Self::new();
        for (from, neighbours) in sources {
            let neighbours = neighbours.as_object().ok_or_else(|| {
                CoreError::InvalidGraph(format!("neighbours of '{}' must be an object", from))
            })?;
            adjacency.add_source(from);
            for (to, weight) in neighbours {
                let weight = weight.as_f64().ok_or_else(|| {
                    CoreError::InvalidGraph(format!("weight of {} -> {} is not a number", from, to))
                })?;
                adjacency.add_edge(from, to, weight).map_err(|_| {
                    CoreError::InvalidGraph(format!(
                        "weight of {} -> {} must be greater than zero, got {}",
                        from, to, weight
                    ))
                })?;
            }
        }

        if adjacency.source_count() == 0 {
            return Err(CoreError::InvalidGraph(
                "graph must contain at least one node".to_string(),
            ));
        }
        Ok(adjacency)
    }

    /// Build from `(from, to, weight)` triples
    pub fn from_edges<'a, I>(edges: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (&'a str, &'a str, f64)>,
    {
        let mut adjacency = Self::new();
        for (from, to, weight) in edges {
            adjacency.add_edge(from, to, weight)?;
        }
        Ok(adjacency)
    }

    fn intern(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.lookup.get(name) {
            return *id;
        }
        let id = NodeId(self.names.len());
        self.names.push(name.to_string());
        self.is_source.push(false);
        self.out.push(Vec::new());
        self.lookup.insert(name.to_string(), id);
        id
    }

    /// Register `name` as a source key, even if it has no outgoing edges
    pub fn add_source(&mut self, name: &str) -> NodeId {
        let id = self.intern(name);
        self.is_source[id.0] = true;
        id
    }

    /// Insert an edge, replacing the weight if it already exists
    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64) -> Result<(), CoreError> {
        let weight = validate_weight(weight)?;
        let from_id = self.add_source(from);
        let to_id = self.intern(to);
        match self.slots.get(&(from_id, to_id)) {
            Some(slot) => self.out[from_id.0][*slot].weight = weight,
            None => {
                self.slots.insert((from_id, to_id), self.out[from_id.0].len());
                self.out[from_id.0].push(Edge { to: to_id, weight });
                self.edge_count += 1;
            }
        }
        Ok(())
    }

    /// Handle of a node, whether it appears as a source or only as a destination
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.lookup.get(name).copied()
    }

    /// Name of a node
    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id.0]
    }

    /// Outgoing edges of a node, in insertion order
    pub fn edges(&self, id: NodeId) -> &[Edge] {
        &self.out[id.0]
    }

    /// Total number of nodes, destinations included
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// No nodes at all
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of distinct source keys
    pub fn source_count(&self) -> usize {
        self.is_source.iter().filter(|source| **source).count()
    }

    /// Number of edges across all sources
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Current weight of `from -> to`
    pub fn weight(&self, from: &str, to: &str) -> Option<f64> {
        let from_id = self.node(from)?;
        let to_id = self.node(to)?;
        self.slots
            .get(&(from_id, to_id))
            .map(|slot| self.out[from_id.0][*slot].weight)
    }

    /// Replace the weight of an existing edge, returning the previous weight
    pub fn set_weight(&mut self, from: &str, to: &str, weight: f64) -> Result<f64, CoreError> {
        let weight = validate_weight(weight)?;
        let not_found = || CoreError::EdgeNotFound {
            from: from.to_string(),
            to: to.to_string(),
        };
        let from_id = self.node(from).ok_or_else(not_found)?;
        let to_id = self.node(to).ok_or_else(not_found)?;
        let slot = *self.slots.get(&(from_id, to_id)).ok_or_else(not_found)?;
        let edge = &mut self.out[from_id.0][slot];
        let previous = edge.weight;
        edge.weight = weight;
        Ok(previous)
    }

    /// Nested map form
    pub fn to_map(&self) -> AdjacencyMap {
        let mut map = AdjacencyMap::new();
        for (index, name) in self.names.iter().enumerate() {
            if !self.is_source[index] {
                continue;
            }
            let neighbours = self.out[index]
                .iter()
                .map(|edge| (self.names[edge.to.0].clone(), edge.weight))
                .collect();
            map.insert(name.clone(), neighbours);
        }
        map
    }
}

impl TryFrom<Value> for Adjacency {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

impl From<Adjacency> for AdjacencyMap {
    fn from(adjacency: Adjacency) -> Self {
        adjacency.to_map()
    }
}
