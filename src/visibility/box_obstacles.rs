use crate::math::{Aabb, Point3};

use super::VisibilityOracle;

/// A scene made of axis-aligned boxes.
///
/// Every box is inflated by `clearance` before testing, so visible segments
/// keep at least that distance (per axis) from the obstacles.
#[derive(Debug, Clone, Default)]
pub struct BoxObstacles {
    boxes: Vec<Aabb>,
    clearance: f64,
}

impl BoxObstacles {
    /// Creates a scene from a list of boxes with zero clearance.
    #[must_use]
    pub fn new(boxes: Vec<Aabb>) -> Self {
        Self {
            boxes,
            clearance: 0.0,
        }
    }

    /// Sets the clearance margin kept around every box.
    #[must_use]
    pub fn with_clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance.max(0.0);
        self
    }

    /// Adds another obstacle.
    pub fn push(&mut self, obstacle: Aabb) {
        self.boxes.push(obstacle);
    }

    /// Returns the obstacle boxes, without clearance.
    #[must_use]
    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Whether `point` lies inside an inflated obstacle.
    #[must_use]
    pub fn is_occupied(&self, point: &Point3) -> bool {
        self.boxes
            .iter()
            .any(|b| b.inflated(self.clearance).contains(point))
    }
}

impl VisibilityOracle for BoxObstacles {
    fn is_visible(&self, from: &Point3, to: &Point3) -> bool {
        !self
            .boxes
            .iter()
            .any(|b| b.inflated(self.clearance).intersects_segment(from, to))
    }
}
