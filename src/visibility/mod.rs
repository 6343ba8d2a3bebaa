mod box_obstacles;
mod triangle_soup;

pub use box_obstacles::BoxObstacles;
pub use triangle_soup::TriangleSoup;

use crate::math::Point3;

/// Answers whether the straight segment between two points is free of static
/// scene geometry.
///
/// Implementations must be total over finite inputs and side-effect free as
/// far as callers can tell. A spatial index (BVH, octree, ...) normally sits
/// behind this trait.
pub trait VisibilityOracle {
    /// Returns `true` if nothing blocks the segment from `from` to `to`.
    fn is_visible(&self, from: &Point3, to: &Point3) -> bool;
}

impl<F> VisibilityOracle for F
where
    F: Fn(&Point3, &Point3) -> bool,
{
    fn is_visible(&self, from: &Point3, to: &Point3) -> bool {
        self(from, to)
    }
}

/// An empty scene: every segment is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl VisibilityOracle for AlwaysVisible {
    fn is_visible(&self, _from: &Point3, _to: &Point3) -> bool {
        true
    }
}
