//! Least-cost path search
//!
//! Dijkstra's algorithm over an [`Adjacency`] snapshot with a binary-heap
//! frontier, O((V + E) log V). Weights are strictly positive, so the first
//! time the goal is popped its distance is final and the search stops.
//!
//! When several paths share the minimum cost the one returned is decided by
//! frontier insertion order, which is deterministic for a given adjacency but
//! not otherwise meaningful.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::adjacency::{Adjacency, NodeId};
use crate::CoreError;

/// Outcome of a successful search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Node names from start to goal inclusive
    pub path: Vec<String>,

    /// Sum of the weights along `path`
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    distance: f64,
    sequence: u64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    // Reversed so the max-heap pops the smallest distance, oldest entry first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the least-cost path from `start` to `goal`
pub fn shortest_path(adjacency: &Adjacency, start: &str, goal: &str) -> Result<PathResult, CoreError> {
    let start_id = adjacency
        .node(start)
        .ok_or_else(|| CoreError::NodeNotFound(start.to_string()))?;
    let goal_id = adjacency
        .node(goal)
        .ok_or_else(|| CoreError::NodeNotFound(goal.to_string()))?;

    // None marks a node not reached yet; an overflowing route still beats it
    let mut distance: Vec<Option<f64>> = vec![None; adjacency.len()];
    let mut previous: Vec<Option<NodeId>> = vec![None; adjacency.len()];
    let mut settled = vec![false; adjacency.len()];
    let mut heap = BinaryHeap::with_capacity(adjacency.len());
    let mut sequence = 0u64;

    distance[start_id.0] = Some(0.0);
    heap.push(Frontier {
        distance: 0.0,
        sequence,
        node: start_id,
    });

    while let Some(Frontier { distance: current, node, .. }) = heap.pop() {
        if settled[node.0] {
            continue;
        }
        settled[node.0] = true;

        if node == goal_id {
            return Ok(PathResult {
                path: reconstruct(adjacency, &previous, goal_id),
                cost: current,
            });
        }

        for edge in adjacency.edges(node) {
            if settled[edge.to.0] {
                continue;
            }
            let candidate = current + edge.weight;
            if distance[edge.to.0].map_or(true, |known| candidate < known) {
                distance[edge.to.0] = Some(candidate);
                previous[edge.to.0] = Some(node);
                sequence += 1;
                heap.push(Frontier {
                    distance: candidate,
                    sequence,
                    node: edge.to,
                });
            }
        }
    }

    Err(CoreError::NoPathExists {
        start: start.to_string(),
        goal: goal.to_string(),
    })
}

fn reconstruct(adjacency: &Adjacency, previous: &[Option<NodeId>], goal: NodeId) -> Vec<String> {
    let mut path = vec![adjacency.name(goal).to_string()];
    let mut cursor = goal;
    while let Some(prev) = previous[cursor.0] {
        path.push(adjacency.name(prev).to_string());
        cursor = prev;
    }
    path.reverse();
    path
}
