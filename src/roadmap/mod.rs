//! Probabilistic roadmap construction.
//!
//! A roadmap is a visibility graph over randomly sampled free-space points
//! plus the query's start and goal. Two nodes are joined when they are closer
//! than the connection radius and the visibility oracle reports the straight
//! segment between them as unobstructed.

mod build;

pub use build::{build_roadmap, BuildRoadmap, RoadmapParams};

use std::fmt;

use crate::error::{PlanningError, Result};
use crate::math::Point3;
use crate::visibility::VisibilityOracle;

/// Index of the start node in a roadmap produced by [`BuildRoadmap`].
pub const START_NODE: usize = 0;

/// Index of the goal node in a roadmap produced by [`BuildRoadmap`].
pub const GOAL_NODE: usize = 1;

/// A roadmap vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    position: Point3,
    /// Adjacent node indices, ascending.
    neighbors: Vec<usize>,
}

impl Node {
    fn new(position: Point3) -> Self {
        Self {
            position,
            neighbors: Vec::new(),
        }
    }

    /// Position of the node.
    #[must_use]
    pub fn position(&self) -> &Point3 {
        &self.position
    }

    /// Indices of adjacent nodes, ascending.
    #[must_use]
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// Whether the node has no edges.
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Undirected visibility graph over free-space points.
///
/// Owns its nodes and borrows the oracle that was used to connect them.
/// Nodes and edges are immutable once built; the edge relation is symmetric.
pub struct Roadmap<'o, O: ?Sized> {
    nodes: Vec<Node>,
    oracle: &'o O,
}

impl<'o, O: VisibilityOracle + ?Sized> Roadmap<'o, O> {
    /// Builds a roadmap from explicit positions and undirected edges.
    ///
    /// The edges are taken as given; the oracle is not consulted. Duplicate
    /// edges are merged.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge refers to a missing node or joins a node
    /// to itself.
    pub fn from_edges(positions: Vec<Point3>, edges: &[(usize, usize)], oracle: &'o O) -> Result<Self> {
        let mut nodes: Vec<Node> = positions.into_iter().map(Node::new).collect();
        let len = nodes.len();
        for &(a, b) in edges {
            if a >= len || b >= len || a == b {
                return Err(PlanningError::InvalidEdge { from: a, to: b, nodes: len }.into());
            }
            nodes[a].neighbors.push(b);
            nodes[b].neighbors.push(a);
        }
        for node in &mut nodes {
            node.neighbors.sort_unstable();
            node.neighbors.dedup();
        }
        Ok(Self { nodes, oracle })
    }

    /// The oracle the roadmap was built against.
    #[must_use]
    pub fn oracle(&self) -> &'o O {
        self.oracle
    }

    /// Whether the straight segment between two points is unobstructed,
    /// according to the roadmap's oracle.
    #[must_use]
    pub fn is_visible(&self, from: &Point3, to: &Point3) -> bool {
        self.oracle.is_visible(from, to)
    }
}

impl<'o, O: ?Sized> Roadmap<'o, O> {
    pub(crate) fn from_nodes(nodes: Vec<Node>, oracle: &'o O) -> Self {
        Self { nodes, oracle }
    }

    /// All nodes, in index order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The node at `index`, if any.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Position of the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn position(&self, index: usize) -> &Point3 {
        &self.nodes[index].position
    }

    /// Neighbours of the node at `index`; empty for out-of-range indices.
    #[must_use]
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.nodes
            .get(index)
            .map(|n| n.neighbors.as_slice())
            .unwrap_or_default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the roadmap has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors.len()).sum::<usize>() / 2
    }

    /// Whether `a` and `b` are joined by an edge.
    #[must_use]
    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Checks that every edge is listed by both of its endpoints.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.nodes
            .iter()
            .enumerate()
            .all(|(i, n)| n.neighbors.iter().all(|&j| self.contains_edge(j, i)))
    }

    /// Index of the node nearest to `position`.
    ///
    /// Ties go to the lowest index. Returns `None` for an empty roadmap.
    #[must_use]
    pub fn closest_node(&self, position: &Point3) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            let d = nalgebra::distance_squared(&node.position, position);
            // Strict comparison keeps the earliest index on ties.
            let closer = match best {
                Some((_, best_d)) => d < best_d,
                None => true,
            };
            if closer {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

impl<O: ?Sized> Clone for Roadmap<'_, O> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            oracle: self.oracle,
        }
    }
}

impl<O: ?Sized> fmt::Debug for Roadmap<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Roadmap")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::visibility::AlwaysVisible;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn square() -> Roadmap<'static, AlwaysVisible> {
        Roadmap::from_edges(
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)],
            &[(0, 1), (1, 2), (2, 3), (3, 0), (1, 0)],
            &AlwaysVisible,
        )
        .unwrap()
    }

    #[test]
    fn from_edges_merges_duplicates() {
        let map = square();
        assert_eq!(map.edge_count(), 4);
        assert_eq!(map.neighbors(0), &[1, 3]);
        assert!(map.is_symmetric());
    }

    #[test]
    fn self_loop_rejected() {
        let result = Roadmap::from_edges(vec![p(0.0, 0.0, 0.0)], &[(0, 0)], &AlwaysVisible);
        assert!(result.is_err());
    }

    #[test]
    fn dangling_edge_rejected() {
        let result = Roadmap::from_edges(vec![p(0.0, 0.0, 0.0)], &[(0, 3)], &AlwaysVisible);
        assert!(result.is_err());
    }

    #[test]
    fn closest_node_picks_nearest() {
        let map = square();
        assert_eq!(map.closest_node(&p(0.9, 1.2, 0.0)), Some(2));
    }

    #[test]
    fn closest_node_tie_goes_to_lowest_index() {
        let map = square();
        // Equidistant from all four corners.
        assert_eq!(map.closest_node(&p(0.5, 0.5, 0.0)), Some(0));
        // Equidistant from nodes 1 and 2.
        assert_eq!(map.closest_node(&p(2.0, 0.5, 0.0)), Some(1));
    }

    #[test]
    fn closest_node_on_empty_roadmap() {
        let map = Roadmap::from_edges(vec![], &[], &AlwaysVisible).unwrap();
        assert_eq!(map.closest_node(&p(0.0, 0.0, 0.0)), None);
    }

    #[test]
    fn out_of_range_neighbors_are_empty() {
        let map = square();
        assert!(map.neighbors(42).is_empty());
        assert!(!map.contains_edge(0, 42));
    }
}
