use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::Rng;
use tracing::debug;

use crate::error::{PlanningError, Result};
use crate::math::Point3;
use crate::roadmap::{BuildRoadmap, Roadmap};
use crate::visibility::VisibilityOracle;

use super::Path;

/// A* search over a roadmap.
///
/// The query points are snapped to their closest roadmap nodes. Edge cost
/// and heuristic are both Euclidean distance, so the heuristic is consistent
/// and the returned path is shortest on the roadmap.
///
/// Among open nodes with equal f-score the one with the lower g-score is
/// expanded first, then the one with the lower node index.
#[derive(Debug, Clone)]
pub struct PlanPath {
    start: Point3,
    goal: Point3,
}

/// Frontier entry. Ordered so that `BinaryHeap` pops the smallest
/// `(f, g, node)` first.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f64,
    g: f64,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.g.total_cmp(&self.g))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PlanPath {
    /// Creates a new `PlanPath` query.
    #[must_use]
    pub fn new(start: Point3, goal: Point3) -> Self {
        Self { start, goal }
    }

    /// Executes the search.
    ///
    /// If start and goal snap to the same node, the path has that single
    /// waypoint and zero cost.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::NoPath`] if the goal node cannot be reached,
    /// or [`PlanningError::EmptyRoadmap`] if the roadmap has no nodes.
    pub fn execute<O: ?Sized>(&self, roadmap: &Roadmap<'_, O>) -> Result<Path> {
        let start = roadmap
            .closest_node(&self.start)
            .ok_or(PlanningError::EmptyRoadmap)?;
        let goal = roadmap
            .closest_node(&self.goal)
            .ok_or(PlanningError::EmptyRoadmap)?;
        let goal_pos = *roadmap.position(goal);
        let heuristic = |node: usize| nalgebra::distance(roadmap.position(node), &goal_pos);

        let n = roadmap.len();
        let mut g_score = vec![f64::INFINITY; n];
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut open = BinaryHeap::new();

        g_score[start] = 0.0;
        open.push(OpenEntry {
            f: heuristic(start),
            g: 0.0,
            node: start,
        });

        let mut expanded = 0usize;
        while let Some(OpenEntry { g, node, .. }) = open.pop() {
            // Skip stale entries left behind by later improvements.
            if closed[node] || g > g_score[node] {
                continue;
            }
            if node == goal {
                let path = reconstruct(roadmap, &parent, goal, g_score[goal]);
                debug!(expanded, waypoints = path.len(), cost = path.cost(), "path found");
                return Ok(path);
            }
            closed[node] = true;
            expanded += 1;

            let here = roadmap.position(node);
            for &next in roadmap.neighbors(node) {
                if closed[next] {
                    continue;
                }
                let tentative = g_score[node] + nalgebra::distance(here, roadmap.position(next));
                if tentative < g_score[next] {
                    g_score[next] = tentative;
                    parent[next] = Some(node);
                    open.push(OpenEntry {
                        f: tentative + heuristic(next),
                        g: tentative,
                        node: next,
                    });
                }
            }
        }

        debug!(expanded, start, goal, "open set exhausted");
        Err(PlanningError::NoPath { start, goal }.into())
    }
}

/// Walks parent links back from `goal` and returns the path in start-to-goal
/// order.
fn reconstruct<O: ?Sized>(
    roadmap: &Roadmap<'_, O>,
    parent: &[Option<usize>],
    goal: usize,
    cost: f64,
) -> Path {
    let mut nodes = vec![goal];
    let mut current = goal;
    while let Some(prev) = parent[current] {
        nodes.push(prev);
        current = prev;
    }
    nodes.reverse();
    let points = nodes.iter().map(|&i| *roadmap.position(i)).collect();
    Path::new(points, nodes, cost)
}

/// Plans a path on an existing roadmap.
///
/// # Errors
///
/// See [`PlanPath::execute`].
pub fn plan_path<O: ?Sized>(start: Point3, goal: Point3, roadmap: &Roadmap<'_, O>) -> Result<Path> {
    PlanPath::new(start, goal).execute(roadmap)
}

/// Builds a fresh roadmap for the query described by `build` and plans over
/// it from its start to its goal.
///
/// # Errors
///
/// Returns an error if roadmap construction fails or no path exists.
pub fn plan_route<O, R>(build: &BuildRoadmap, oracle: &O, rng: &mut R) -> Result<Path>
where
    O: VisibilityOracle + ?Sized,
    R: Rng + ?Sized,
{
    let roadmap = build.execute(oracle, rng)?;
    plan_path(*build.start(), *build.goal(), &roadmap)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::QuadnavError;
    use crate::math::Aabb;
    use crate::roadmap::{GOAL_NODE, START_NODE};
    use crate::visibility::{AlwaysVisible, BoxObstacles};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn cube_100() -> Aabb {
        Aabb::new(p(0.0, 0.0, 0.0), p(100.0, 100.0, 100.0)).unwrap()
    }

    /// Independent shortest-path lengths from `source` by O(n^2) Dijkstra.
    fn dijkstra<O: ?Sized>(roadmap: &Roadmap<'_, O>, source: usize) -> Vec<f64> {
        let n = roadmap.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut done = vec![false; n];
        dist[source] = 0.0;
        for _ in 0..n {
            let Some(u) = (0..n)
                .filter(|&i| !done[i] && dist[i].is_finite())
                .min_by(|&a, &b| dist[a].total_cmp(&dist[b]))
            else {
                break;
            };
            done[u] = true;
            for &v in roadmap.neighbors(u) {
                let d = dist[u] + nalgebra::distance(roadmap.position(u), roadmap.position(v));
                if d < dist[v] {
                    dist[v] = d;
                }
            }
        }
        dist
    }

    fn assert_valid<O: ?Sized>(path: &Path, roadmap: &Roadmap<'_, O>) {
        for w in path.node_indices().windows(2) {
            assert!(roadmap.contains_edge(w[0], w[1]), "missing edge {w:?}");
        }
        let costs = path.cumulative_costs();
        assert_eq!(costs[0], 0.0);
        assert!(costs.windows(2).all(|c| c[0] <= c[1]));
        assert_relative_eq!(*costs.last().unwrap(), path.cost(), epsilon = 1e-9);
    }

    #[test]
    fn direct_edge_gives_two_point_path() {
        let mut rng = StdRng::seed_from_u64(0);
        let start = p(0.0, 0.0, 0.0);
        let goal = p(10.0, 0.0, 0.0);
        let map = BuildRoadmap::new(cube_100(), 0, start, goal)
            .execute(&AlwaysVisible, &mut rng)
            .unwrap();
        let path = plan_path(start, goal, &map).unwrap();
        assert_eq!(path.points(), &[start, goal]);
        assert_relative_eq!(path.cost(), 10.0);
    }

    #[test]
    fn detours_through_visible_waypoint() {
        let start = p(0.0, 0.0, 0.0);
        let goal = p(10.0, 0.0, 0.0);
        let via = p(5.0, 5.0, 0.0);
        let blocked = move |a: &Point3, b: &Point3| {
            !((*a == start && *b == goal) || (*a == goal && *b == start))
        };
        let map = Roadmap::from_edges(vec![start, goal, via], &[], &blocked).unwrap();
        // Connect the way the builder would: every visible pair.
        let edges: Vec<(usize, usize)> = [(0, 1), (0, 2), (1, 2)]
            .into_iter()
            .filter(|&(a, b)| map.is_visible(map.position(a), map.position(b)))
            .collect();
        let map = Roadmap::from_edges(vec![start, goal, via], &edges, &blocked).unwrap();

        let path = plan_path(start, goal, &map).unwrap();
        assert_eq!(path.points(), &[start, via, goal]);
    }

    #[test]
    fn isolated_goal_is_not_found() {
        let map = Roadmap::from_edges(
            vec![p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), p(5.0, 5.0, 0.0)],
            &[(0, 2)],
            &AlwaysVisible,
        )
        .unwrap();
        let err = plan_path(*map.position(START_NODE), *map.position(GOAL_NODE), &map).unwrap_err();
        assert!(matches!(
            err,
            QuadnavError::Planning(PlanningError::NoPath { start: 0, goal: 1 })
        ));
    }

    #[test]
    fn empty_roadmap_is_an_error() {
        let map = Roadmap::from_edges(vec![], &[], &AlwaysVisible).unwrap();
        let err = plan_path(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), &map).unwrap_err();
        assert!(matches!(err, QuadnavError::Planning(PlanningError::EmptyRoadmap)));
    }

    #[test]
    fn same_start_and_goal_is_single_waypoint() {
        let map = Roadmap::from_edges(vec![p(1.0, 2.0, 3.0)], &[], &AlwaysVisible).unwrap();
        let path = plan_path(p(1.0, 2.0, 3.0), p(1.0, 2.0, 3.0), &map).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.cost(), 0.0);
    }

    #[test]
    fn prefers_shorter_of_two_routes() {
        // 0 -> 2 -> 1 is shorter than 0 -> 3 -> 1.
        let map = Roadmap::from_edges(
            vec![p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), p(5.0, 1.0, 0.0), p(5.0, -8.0, 0.0)],
            &[(0, 3), (3, 1), (0, 2), (2, 1)],
            &AlwaysVisible,
        )
        .unwrap();
        let path = plan_path(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), &map).unwrap();
        assert_eq!(path.node_indices(), &[0, 2, 1]);
        assert_valid(&path, &map);
    }

    #[test]
    fn equal_cost_routes_resolve_deterministically() {
        // Two mirror-image detours with identical cost.
        let map = Roadmap::from_edges(
            vec![p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), p(5.0, 5.0, 0.0), p(5.0, -5.0, 0.0)],
            &[(0, 2), (2, 1), (0, 3), (3, 1)],
            &AlwaysVisible,
        )
        .unwrap();
        let first = plan_path(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), &map).unwrap();
        for _ in 0..5 {
            let again = plan_path(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), &map).unwrap();
            assert_eq!(again.node_indices(), first.node_indices());
        }
        assert_eq!(first.node_indices(), &[0, 2, 1]);
    }

    #[test]
    fn matches_dijkstra_on_random_roadmaps() {
        let wall = BoxObstacles::new(vec![
            Aabb::new(p(30.0, 0.0, 0.0), p(40.0, 70.0, 100.0)).unwrap(),
            Aabb::new(p(60.0, 30.0, 0.0), p(70.0, 100.0, 100.0)).unwrap(),
        ]);
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let map = BuildRoadmap::new(cube_100(), 150, p(5.0, 50.0, 50.0), p(95.0, 50.0, 50.0))
                .execute(&wall, &mut rng)
                .unwrap();
            let reference = dijkstra(&map, START_NODE)[GOAL_NODE];
            match plan_path(*map.position(START_NODE), *map.position(GOAL_NODE), &map) {
                Ok(path) => {
                    assert_valid(&path, &map);
                    assert_relative_eq!(path.cost(), reference, epsilon = 1e-9);
                    assert_relative_eq!(path.total_length(), reference, epsilon = 1e-9);
                }
                Err(err) => {
                    assert!(reference.is_infinite(), "seed {seed}: {err}");
                }
            }
        }
    }

    #[test]
    fn plan_route_rebuilds_and_plans() {
        let mut rng = StdRng::seed_from_u64(5);
        let build = BuildRoadmap::new(cube_100(), 0, p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0));
        let path = plan_route(&build, &AlwaysVisible, &mut rng).unwrap();
        assert_eq!(path.len(), 2);
    }
}
