// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Static undirected contact-network topology shared across spoor crates.
//! Pure data (dense node ids + adjacency) with deterministic iteration.
//!
//! The signal machinery only ever *reads* a topology: it needs `order`,
//! `nodes` and `neighbors` lookups while replaying an epidemic event
//! stream. Construction happens up front; the graph is immutable for the
//! lifetime of a replay.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

use thiserror::Error;

/// Dense node identifier.
///
/// Nodes are arena-style indices `0..order`, assigned by whatever produced
/// the topology. The signal crates treat them as opaque keys.
pub type NodeId = u32;

/// Error returned by [`Graph`] construction methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge endpoint does not name a node of this graph.
    #[error("node {0} is outside the graph (order {1})")]
    NodeOutOfRange(NodeId, usize),
    /// Self-loops carry no epidemic meaning and are rejected.
    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),
}

/// Undirected adjacency store over dense node ids.
///
/// Neighbor lists preserve insertion order, which makes every traversal in
/// the signal crates deterministic. Duplicate edges are ignored rather
/// than rejected so that edge lists harvested from simulation output can
/// be loaded verbatim.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Graph {
    adjacency: Vec<Vec<NodeId>>,
}

impl Graph {
    /// Creates a graph with `order` isolated nodes.
    #[must_use]
    pub fn with_order(order: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); order],
        }
    }

    /// Builds a graph from an edge list over `0..order`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if an endpoint is out of range or an edge is
    /// a self-loop.
    pub fn from_edges(order: usize, edges: &[(NodeId, NodeId)]) -> Result<Self, GraphError> {
        let mut g = Self::with_order(order);
        for &(a, b) in edges {
            g.add_edge(a, b)?;
        }
        Ok(g)
    }

    /// Adds the undirected edge `{a, b}`. Duplicate edges are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if an endpoint is out of range or `a == b`.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<(), GraphError> {
        let order = self.order();
        if (a as usize) >= order {
            return Err(GraphError::NodeOutOfRange(a, order));
        }
        if (b as usize) >= order {
            return Err(GraphError::NodeOutOfRange(b, order));
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if self.adjacency[a as usize].contains(&b) {
            return Ok(());
        }
        self.adjacency[a as usize].push(b);
        self.adjacency[b as usize].push(a);
        Ok(())
    }

    /// Number of nodes.
    #[must_use]
    pub fn order(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn size(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Iterate over all node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.order()).map(|n| n as NodeId)
    }

    /// Neighbors of `node`, in insertion order.
    ///
    /// Out-of-range ids yield an empty slice; the signal crates only ever
    /// ask about nodes the graph handed out.
    #[must_use]
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency
            .get(node as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Degree of `node` (0 for out-of-range ids).
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Returns `true` when `node` names a node of this graph.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        (node as usize) < self.order()
    }

    /// Returns `true` when the undirected edge `{a, b}` exists.
    #[must_use]
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).contains(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_edges_builds_symmetric_adjacency() {
        let g = Graph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]).unwrap();
        assert_eq!(g.order(), 4);
        assert_eq!(g.size(), 3);
        assert_eq!(g.neighbors(1), &[0, 2]);
        assert_eq!(g.neighbors(2), &[1, 3]);
        assert!(g.has_edge(0, 1));
        assert!(g.has_edge(1, 0));
        assert!(!g.has_edge(0, 3));
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let mut g = Graph::with_order(2);
        g.add_edge(0, 1).unwrap();
        g.add_edge(0, 1).unwrap();
        g.add_edge(1, 0).unwrap();
        assert_eq!(g.size(), 1);
        assert_eq!(g.neighbors(0), &[1]);
    }

    #[test]
    fn out_of_range_endpoint_is_rejected() {
        let mut g = Graph::with_order(2);
        assert_eq!(g.add_edge(0, 2), Err(GraphError::NodeOutOfRange(2, 2)));
        assert_eq!(g.add_edge(5, 0), Err(GraphError::NodeOutOfRange(5, 2)));
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut g = Graph::with_order(1);
        assert_eq!(g.add_edge(0, 0), Err(GraphError::SelfLoop(0)));
    }

    #[test]
    fn neighbor_order_is_insertion_order() {
        let g = Graph::from_edges(4, &[(0, 3), (0, 1), (0, 2)]).unwrap();
        assert_eq!(g.neighbors(0), &[3, 1, 2]);
    }

    #[test]
    fn empty_graph_queries_are_safe() {
        let g = Graph::default();
        assert_eq!(g.order(), 0);
        assert_eq!(g.nodes().count(), 0);
        assert!(g.neighbors(0).is_empty());
        assert_eq!(g.degree(7), 0);
        assert!(!g.contains(0));
    }
}
