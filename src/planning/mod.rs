mod astar;

pub use astar::{plan_path, plan_route, PlanPath};

use crate::math::Point3;

/// An ordered sequence of waypoints from start to goal, inclusive.
///
/// Produced by the planner; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    points: Vec<Point3>,
    nodes: Vec<usize>,
    cost: f64,
}

impl Path {
    pub(crate) fn new(points: Vec<Point3>, nodes: Vec<usize>, cost: f64) -> Self {
        Self {
            points,
            nodes,
            cost,
        }
    }

    /// The waypoints, start first.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Roadmap node index of every waypoint.
    #[must_use]
    pub fn node_indices(&self) -> &[usize] {
        &self.nodes
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path has no waypoints. Paths returned by the planner are
    /// never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total cost reported by the planner (the goal's g-score).
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Sum of the segment lengths.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.segments().map(|(a, b)| nalgebra::distance(a, b)).sum()
    }

    /// Consecutive waypoint pairs.
    pub fn segments(&self) -> impl Iterator<Item = (&Point3, &Point3)> + '_ {
        self.points.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Cost-to-come at every waypoint: zero at the start, the total cost at
    /// the goal.
    #[must_use]
    pub fn cumulative_costs(&self) -> Vec<f64> {
        let mut acc = 0.0;
        let mut costs = Vec::with_capacity(self.points.len());
        if !self.points.is_empty() {
            costs.push(0.0);
        }
        for (a, b) in self.segments() {
            acc += nalgebra::distance(a, b);
            costs.push(acc);
        }
        costs
    }

    /// Consumes the path, returning its waypoints.
    #[must_use]
    pub fn into_points(self) -> Vec<Point3> {
        self.points
    }
}
