mod integrator;

pub use integrator::{integrate, IntegrationPolicy};

use crate::math::{orthonormality_error, Matrix3, Point3, Vector3};

/// Kinematic state of a rigid body.
///
/// `rotation` maps body axes to world axes and is kept orthonormal by every
/// integration step. Velocities are expressed in the world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyState {
    /// Centre of mass, world frame.
    pub position: Point3,
    /// Body-to-world rotation.
    pub rotation: Matrix3,
    /// Linear velocity, world frame.
    pub velocity: Vector3,
    /// Angular velocity, world frame.
    pub angular_velocity: Vector3,
}

impl RigidBodyState {
    /// A body at rest at `position` with identity orientation.
    #[must_use]
    pub fn at_rest(position: Point3) -> Self {
        Self {
            position,
            rotation: Matrix3::identity(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// Replaces the orientation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Matrix3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Replaces the linear velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Replaces the angular velocity.
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: Vector3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Whether the rotation's columns are unit length and mutually
    /// orthogonal within `tolerance`.
    #[must_use]
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        orthonormality_error(&self.rotation) <= tolerance
    }
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self::at_rest(Point3::origin())
    }
}

/// Linear and angular acceleration acting on a body, world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Accelerations {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Accelerations {
    #[must_use]
    pub fn new(linear: Vector3, angular: Vector3) -> Self {
        Self { linear, angular }
    }
}
