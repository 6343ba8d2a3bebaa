use tracing::trace;

use crate::dynamics::{Accelerations, RigidBodyState};
use crate::math::rotation::{body_forward, body_up, look_rotation, rotate_about, rotation_difference};
use crate::math::{
    angle_between, any_perpendicular, clamp_length, normalize_or, world_up, Matrix3, Point3, Vector3,
    TOLERANCE,
};

use super::ControlLimits;

/// Shortest control horizon the controller will divide by.
const MIN_PLANNING_DT: f64 = 1e-6;

/// What the controller is asked to do on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRequest {
    /// Waypoint to fly toward.
    pub goal: Point3,
    /// Control horizon used to turn position and attitude errors into
    /// preferred velocities and accelerations. Not the integrator step.
    pub planning_dt: f64,
    /// Direction the vehicle should face. Defaults to the direction of
    /// travel toward `goal`.
    pub look_direction: Option<Vector3>,
    /// Vehicle mass, used to turn thrust limits into acceleration limits.
    pub mass: f64,
    /// Acceleration the environment applies regardless of thrust (gravity,
    /// wind). The controller cancels it out.
    pub external_acceleration: Vector3,
}

impl ControlRequest {
    /// A request for a unit-mass vehicle with no external acceleration.
    #[must_use]
    pub fn new(goal: Point3, planning_dt: f64) -> Self {
        Self {
            goal,
            planning_dt,
            look_direction: None,
            mass: 1.0,
            external_acceleration: Vector3::zeros(),
        }
    }

    #[must_use]
    pub fn with_look_direction(mut self, look: Vector3) -> Self {
        self.look_direction = Some(look);
        self
    }

    #[must_use]
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    #[must_use]
    pub fn with_external_acceleration(mut self, acceleration: Vector3) -> Self {
        self.external_acceleration = acceleration;
        self
    }
}

/// Turns the current state and a target waypoint into bounded linear and
/// angular acceleration commands.
///
/// The controller is stateless: each call depends only on its inputs, so one
/// controller can serve any number of vehicles with the same limits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlightController {
    limits: ControlLimits,
}

impl FlightController {
    /// Creates a controller. `limits` should have passed
    /// [`ControlLimits::validate`].
    #[must_use]
    pub fn new(limits: ControlLimits) -> Self {
        Self { limits }
    }

    /// The limits this controller enforces.
    #[must_use]
    pub fn limits(&self) -> &ControlLimits {
        &self.limits
    }

    /// Computes the commanded accelerations for one tick.
    ///
    /// `linear` is the thrust acceleration only; the caller adds the
    /// external acceleration back when integrating. Its magnitude always lies
    /// in `[min_thrust, max_thrust] / mass`.
    #[must_use]
    pub fn compute_accelerations(&self, state: &RigidBodyState, request: &ControlRequest) -> Accelerations {
        let dt = request.planning_dt.max(MIN_PLANNING_DT);
        let thrust = self.preferred_thrust(state, request);

        let to_goal = request.goal - state.position;
        let look = request.look_direction.unwrap_or(to_goal);
        let target = self.preferred_rotation(state, &thrust, &look);
        let target_omega = self.preferred_angular_velocity(state, &target, to_goal.norm(), dt);
        let angular = (target_omega - state.angular_velocity) / dt;

        trace!(
            thrust = thrust.norm(),
            tilt = angle_between(&body_up(&target), &world_up()),
            spin = target_omega.norm(),
            "control step"
        );
        Accelerations::new(thrust, angular)
    }

    /// Velocity the vehicle would like to have: straight at the goal, capped
    /// at `max_speed`, ramping linearly to zero inside `close_range`.
    #[must_use]
    pub fn preferred_velocity(&self, state: &RigidBodyState, goal: &Point3, planning_dt: f64) -> Vector3 {
        let dt = planning_dt.max(MIN_PLANNING_DT);
        let delta = goal - state.position;
        let distance = delta.norm();
        if distance < self.limits.close_range {
            delta * (self.limits.max_speed / self.limits.close_range)
        } else {
            clamp_length(&(delta / dt), self.limits.max_speed)
        }
    }

    /// Thrust acceleration that drives the velocity toward the preferred
    /// velocity within one control horizon, with external acceleration
    /// cancelled and the magnitude clamped to the thrust limits.
    ///
    /// A zero demand keeps the current body up axis as its direction.
    #[must_use]
    pub fn preferred_thrust(&self, state: &RigidBodyState, request: &ControlRequest) -> Vector3 {
        let dt = request.planning_dt.max(MIN_PLANNING_DT);
        let preferred = self.preferred_velocity(state, &request.goal, dt);
        let desired = (preferred - state.velocity) / dt - request.external_acceleration;

        let mass = request.mass.max(TOLERANCE);
        let min_accel = self.limits.min_thrust / mass;
        let max_accel = self.limits.max_thrust / mass;
        let direction = normalize_or(&desired, body_up(&state.rotation));
        direction * desired.norm().max(min_accel).min(max_accel)
    }

    /// Attitude that points the body's up axis along `thrust`, tilted no
    /// more than `max_tilt_angle` from world up, and faces along `look`.
    ///
    /// If `look` is within `max_angle_error` of the up axis, the current
    /// forward axis is kept instead.
    #[must_use]
    pub fn preferred_rotation(&self, state: &RigidBodyState, thrust: &Vector3, look: &Vector3) -> Matrix3 {
        let vertical = world_up();
        let mut up = normalize_or(thrust, body_up(&state.rotation));

        let tilt = angle_between(&up, &vertical);
        if tilt > self.limits.max_tilt_angle {
            // Rotating about up x vertical swings `up` toward vertical.
            let axis = up.cross(&vertical);
            let axis = if axis.norm() > TOLERANCE {
                axis
            } else {
                any_perpendicular(&up)
            };
            up = rotate_about(&up, &axis, tilt - self.limits.max_tilt_angle);
        }

        look_rotation(&up, look, &body_forward(&state.rotation), self.limits.max_angle_error)
    }

    /// Angular velocity that closes the gap to `target` within one control
    /// horizon, capped at `max_roll_rate` and scaled down inside
    /// `close_range`. Zero when the gap is inside the `max_angle_error`
    /// deadband.
    #[must_use]
    pub fn preferred_angular_velocity(
        &self,
        state: &RigidBodyState,
        target: &Matrix3,
        distance_to_goal: f64,
        planning_dt: f64,
    ) -> Vector3 {
        let dt = planning_dt.max(MIN_PLANNING_DT);
        let diff = rotation_difference(&state.rotation, target);

        // |w| = cos(angle / 2); larger angles give smaller w.
        if diff.w >= (self.limits.max_angle_error * 0.5).cos() {
            return Vector3::zeros();
        }
        let Some(axis) = diff.imag().try_normalize(TOLERANCE) else {
            return Vector3::zeros();
        };

        let angle = 2.0 * diff.w.min(1.0).acos();
        let mut omega = clamp_length(&(axis * (angle / dt)), self.limits.max_roll_rate);
        if distance_to_goal < self.limits.close_range {
            omega *= distance_to_goal / self.limits.close_range;
        }
        omega
    }
}

/// Computes one tick of control for a unit-mass vehicle with no external
/// acceleration.
#[must_use]
pub fn control_step(
    state: &RigidBodyState,
    goal: Point3,
    planning_dt: f64,
    limits: &ControlLimits,
) -> Accelerations {
    FlightController::new(*limits).compute_accelerations(state, &ControlRequest::new(goal, planning_dt))
}
