use rand::Rng;

use crate::error::{GeometryError, Result};

use super::{Point3, Vector3, TOLERANCE};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Creates a box from its two corners.
    ///
    /// # Errors
    ///
    /// Returns an error if a coordinate is not finite or `min` exceeds `max`
    /// on any axis.
    pub fn new(min: Point3, max: Point3) -> Result<Self> {
        if !min.iter().chain(max.iter()).all(|c| c.is_finite()) {
            return Err(GeometryError::NonFinite("bounding box corner").into());
        }
        if min.iter().zip(max.iter()).any(|(lo, hi)| lo > hi) {
            return Err(GeometryError::InvalidBounds {
                min: min.coords.into(),
                max: max.coords.into(),
            }
            .into());
        }
        Ok(Self { min, max })
    }

    /// Creates a box centred on `center` with the given half extents.
    ///
    /// # Errors
    ///
    /// Returns an error if any half extent is negative or not finite.
    pub fn from_center(center: Point3, half_extents: Vector3) -> Result<Self> {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Centre point of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths along each axis.
    #[must_use]
    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }

    /// Whether `point` lies inside or on the boundary of the box.
    #[must_use]
    pub fn contains(&self, point: &Point3) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Returns the box grown by `margin` on every side.
    #[must_use]
    pub fn inflated(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Draws a point uniformly at random inside the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3 {
        let extents = self.extents();
        Point3::new(
            self.min.x + extents.x * rng.gen::<f64>(),
            self.min.y + extents.y * rng.gen::<f64>(),
            self.min.z + extents.z * rng.gen::<f64>(),
        )
    }

    /// Whether the segment from `a` to `b` touches the box (slab test).
    #[must_use]
    pub fn intersects_segment(&self, a: &Point3, b: &Point3) -> bool {
        let dir = b - a;
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;

        for i in 0..3 {
            if dir[i].abs() < TOLERANCE {
                // Segment is parallel to this slab: must start inside it.
                if a[i] < self.min[i] || a[i] > self.max[i] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir[i];
            let mut t0 = (self.min[i] - a[i]) * inv;
            let mut t1 = (self.max[i] - a[i]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}
