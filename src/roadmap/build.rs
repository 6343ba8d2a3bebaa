use rand::Rng;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::math::{Aabb, Point3};
use crate::visibility::VisibilityOracle;

use super::{Node, Roadmap};

/// Parameters controlling roadmap construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadmapParams {
    /// Nodes farther apart than this are never connected.
    pub connection_radius: f64,
    /// Upper bound on sampling attempts per requested sample when a
    /// free-space filter rejects candidates.
    pub max_attempts_per_sample: usize,
}

impl Default for RoadmapParams {
    fn default() -> Self {
        Self {
            connection_radius: 30.0,
            max_attempts_per_sample: 32,
        }
    }
}

impl RoadmapParams {
    /// Checks that the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection radius is not positive and finite,
    /// or if no sampling attempts are allowed.
    pub fn validate(&self) -> Result<()> {
        ConfigError::check_positive("connection_radius", self.connection_radius)?;
        if self.max_attempts_per_sample == 0 {
            return Err(
                ConfigError::InvalidParameter("max_attempts_per_sample must be at least 1".into())
                    .into(),
            );
        }
        Ok(())
    }
}

/// Builds a probabilistic roadmap between a start and a goal.
///
/// The node set is `start` (index 0), `goal` (index 1), then the random
/// samples in draw order. Sampling uses the caller's RNG, so a seeded RNG
/// gives a reproducible roadmap.
#[derive(Debug, Clone)]
pub struct BuildRoadmap {
    bounds: Aabb,
    sample_count: usize,
    start: Point3,
    goal: Point3,
    params: RoadmapParams,
}

impl BuildRoadmap {
    /// Creates a new `BuildRoadmap` operation with default parameters.
    #[must_use]
    pub fn new(bounds: Aabb, sample_count: usize, start: Point3, goal: Point3) -> Self {
        Self {
            bounds,
            sample_count,
            start,
            goal,
            params: RoadmapParams::default(),
        }
    }

    /// Replaces the construction parameters.
    #[must_use]
    pub fn with_params(mut self, params: RoadmapParams) -> Self {
        self.params = params;
        self
    }

    /// Start position of the query.
    #[must_use]
    pub fn start(&self) -> &Point3 {
        &self.start
    }

    /// Goal position of the query.
    #[must_use]
    pub fn goal(&self) -> &Point3 {
        &self.goal
    }

    /// Executes the build, sampling `sample_count` points anywhere in the
    /// bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid.
    pub fn execute<'o, O, R>(&self, oracle: &'o O, rng: &mut R) -> Result<Roadmap<'o, O>>
    where
        O: VisibilityOracle + ?Sized,
        R: Rng + ?Sized,
    {
        self.execute_filtered(oracle, rng, |_| true)
    }

    /// Executes the build, keeping only samples for which `is_free` holds.
    ///
    /// Rejected candidates are redrawn up to
    /// [`RoadmapParams::max_attempts_per_sample`] times per sample, so the
    /// roadmap may end up with fewer samples than requested in very
    /// cluttered scenes.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid.
    pub fn execute_filtered<'o, O, R, F>(
        &self,
        oracle: &'o O,
        rng: &mut R,
        is_free: F,
    ) -> Result<Roadmap<'o, O>>
    where
        O: VisibilityOracle + ?Sized,
        R: Rng + ?Sized,
        F: Fn(&Point3) -> bool,
    {
        self.params.validate()?;
        let mut nodes = self.sample_nodes(rng, is_free);
        let pairs = self.candidate_pairs(&nodes);
        let visible: Vec<bool> = pairs
            .iter()
            .map(|&(a, b)| oracle.is_visible(&nodes[a].position, &nodes[b].position))
            .collect();
        connect(&mut nodes, &pairs, &visible);
        Ok(Roadmap::from_nodes(nodes, oracle))
    }

    /// Executes the build with the pair visibility tests spread over the
    /// rayon thread pool. Produces the same roadmap as [`execute`](Self::execute)
    /// for the same RNG state.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid.
    #[cfg(feature = "parallel")]
    pub fn execute_par<'o, O, R>(&self, oracle: &'o O, rng: &mut R) -> Result<Roadmap<'o, O>>
    where
        O: VisibilityOracle + Sync + ?Sized,
        R: Rng + ?Sized,
    {
        use rayon::prelude::*;

        self.params.validate()?;
        let mut nodes = self.sample_nodes(rng, |_| true);
        let pairs = self.candidate_pairs(&nodes);
        let visible: Vec<bool> = pairs
            .par_iter()
            .map(|&(a, b)| oracle.is_visible(&nodes[a].position, &nodes[b].position))
            .collect();
        connect(&mut nodes, &pairs, &visible);
        Ok(Roadmap::from_nodes(nodes, oracle))
    }

    fn sample_nodes<R, F>(&self, rng: &mut R, is_free: F) -> Vec<Node>
    where
        R: Rng + ?Sized,
        F: Fn(&Point3) -> bool,
    {
        let mut nodes = Vec::with_capacity(self.sample_count + 2);
        nodes.push(Node::new(self.start));
        nodes.push(Node::new(self.goal));

        let max_attempts = self.sample_count.saturating_mul(self.params.max_attempts_per_sample);
        let mut attempts = 0;
        while nodes.len() < self.sample_count + 2 && attempts < max_attempts {
            attempts += 1;
            let candidate = self.bounds.sample(rng);
            if is_free(&candidate) {
                nodes.push(Node::new(candidate));
            }
        }
        if nodes.len() < self.sample_count + 2 {
            debug!(
                requested = self.sample_count,
                accepted = nodes.len() - 2,
                "sample budget exhausted"
            );
        }
        nodes
    }

    /// Unordered node pairs within the connection radius, in lexicographic
    /// order.
    fn candidate_pairs(&self, nodes: &[Node]) -> Vec<(usize, usize)> {
        let radius_sq = self.params.connection_radius * self.params.connection_radius;
        let mut pairs = Vec::new();
        for (i, a) in nodes.iter().enumerate() {
            for (j, b) in nodes.iter().enumerate().skip(i + 1) {
                if nalgebra::distance_squared(&a.position, &b.position) < radius_sq {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}

/// Adds an edge for every visible pair. Pairs arrive in lexicographic order,
/// which keeps each neighbour list ascending.
fn connect(nodes: &mut [Node], pairs: &[(usize, usize)], visible: &[bool]) {
    let mut edges = 0usize;
    for (&(a, b), &is_visible) in pairs.iter().zip(visible) {
        if !is_visible {
            continue;
        }
        nodes[a].neighbors.push(b);
        nodes[b].neighbors.push(a);
        edges += 1;
    }
    debug!(
        nodes = nodes.len(),
        candidate_pairs = pairs.len(),
        edges,
        "roadmap built"
    );
}

/// Builds a roadmap with default parameters.
///
/// # Errors
///
/// Returns an error if the default parameters are rejected, which does not
/// happen in practice.
pub fn build_roadmap<'o, O, R>(
    bounds: Aabb,
    sample_count: usize,
    start: Point3,
    goal: Point3,
    oracle: &'o O,
    rng: &mut R,
) -> Result<Roadmap<'o, O>>
where
    O: VisibilityOracle + ?Sized,
    R: Rng + ?Sized,
{
    BuildRoadmap::new(bounds, sample_count, start, goal).execute(oracle, rng)
}
