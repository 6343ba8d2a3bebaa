use crate::math::{Aabb, Point3, TOLERANCE};

use super::VisibilityOracle;

/// A scene made of unconnected triangles, tested by brute force.
///
/// Useful for small scenes and as a reference for faster spatial indices.
/// Segments that touch a triangle, including at an endpoint, are blocked.
#[derive(Debug, Clone, Default)]
pub struct TriangleSoup {
    triangles: Vec<[Point3; 3]>,
}

impl TriangleSoup {
    /// Creates a scene from a list of triangles.
    #[must_use]
    pub fn new(triangles: Vec<[Point3; 3]>) -> Self {
        Self { triangles }
    }

    /// Adds the 12 triangles of a box's surface.
    pub fn push_box(&mut self, b: &Aabb) {
        let (lo, hi) = (b.min, b.max);
        let c = |x: bool, y: bool, z: bool| {
            Point3::new(
                if x { hi.x } else { lo.x },
                if y { hi.y } else { lo.y },
                if z { hi.z } else { lo.z },
            )
        };
        let quads = [
            [c(false, false, false), c(true, false, false), c(true, true, false), c(false, true, false)],
            [c(false, false, true), c(true, false, true), c(true, true, true), c(false, true, true)],
            [c(false, false, false), c(false, true, false), c(false, true, true), c(false, false, true)],
            [c(true, false, false), c(true, true, false), c(true, true, true), c(true, false, true)],
            [c(false, false, false), c(true, false, false), c(true, false, true), c(false, false, true)],
            [c(false, true, false), c(true, true, false), c(true, true, true), c(false, true, true)],
        ];
        for [a, b, c, d] in quads {
            self.triangles.push([a, b, c]);
            self.triangles.push([a, c, d]);
        }
    }

    /// Number of triangles in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the scene has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

impl VisibilityOracle for TriangleSoup {
    fn is_visible(&self, from: &Point3, to: &Point3) -> bool {
        !self
            .triangles
            .iter()
            .any(|tri| segment_hits_triangle(from, to, tri))
    }
}

/// Möller–Trumbore intersection restricted to the segment `a..b`.
fn segment_hits_triangle(a: &Point3, b: &Point3, tri: &[Point3; 3]) -> bool {
    let dir = b - a;
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];

    let h = dir.cross(&e2);
    let det = e1.dot(&h);
    if det.abs() < TOLERANCE {
        // Segment is parallel to the triangle's plane; coplanar grazing is
        // treated as unobstructed.
        return false;
    }
    let inv_det = 1.0 / det;

    let s = a - tri[0];
    let u = s.dot(&h) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    let t = e2.dot(&q) * inv_det;
    (0.0..=1.0).contains(&t)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn floor_tile() -> TriangleSoup {
        TriangleSoup::new(vec![[p(-1.0, 0.0, -1.0), p(1.0, 0.0, -1.0), p(0.0, 0.0, 1.0)]])
    }

    #[test]
    fn vertical_segment_through_triangle_is_blocked() {
        assert!(!floor_tile().is_visible(&p(0.0, 1.0, 0.0), &p(0.0, -1.0, 0.0)));
    }

    #[test]
    fn segment_ending_above_triangle_is_visible() {
        assert!(floor_tile().is_visible(&p(0.0, 2.0, 0.0), &p(0.0, 0.5, 0.0)));
    }

    #[test]
    fn segment_beside_triangle_is_visible() {
        assert!(floor_tile().is_visible(&p(5.0, 1.0, 0.0), &p(5.0, -1.0, 0.0)));
    }

    #[test]
    fn box_surface_blocks_crossing() {
        let mut soup = TriangleSoup::default();
        soup.push_box(&Aabb::new(p(4.0, -1.0, -1.0), p(6.0, 1.0, 1.0)).unwrap());
        assert_eq!(soup.len(), 12);
        assert!(!soup.is_visible(&p(0.0, 0.0, 0.0), &p(10.0, 0.0, 0.0)));
        assert!(soup.is_visible(&p(0.0, 3.0, 0.0), &p(10.0, 3.0, 0.0)));
    }
}
