mod simulation;

pub use simulation::{Simulation, SimulationConfig};

use std::collections::VecDeque;

use tracing::debug;

use crate::control::{ControlLimits, ControlRequest, FlightController, Motor, ThrustAllocator};
use crate::dynamics::{integrate, Accelerations, IntegrationPolicy, RigidBodyState};
use crate::error::{ConfigError, Result};
use crate::math::{Matrix3, Point3, Vector3};
use crate::planning::Path;

/// Physical and behavioural parameters of one vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleParams {
    /// Kilograms.
    pub mass: f64,
    /// Inertia tensor about the centre of mass, body frame.
    pub inertia: Matrix3,
    /// Control horizon handed to the flight controller, seconds.
    pub planning_dt: f64,
    /// A waypoint counts as reached within this distance.
    pub arrival_radius: f64,
    pub limits: ControlLimits,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inertia: Matrix3::from_diagonal(&Vector3::new(0.02, 0.04, 0.02)),
            planning_dt: 0.5,
            arrival_radius: 1.0,
            limits: ControlLimits::default(),
        }
    }
}

impl VehicleParams {
    /// # Errors
    ///
    /// Returns an error if the mass, horizon or arrival radius is not
    /// positive, the inertia has a non-positive or non-finite diagonal, or
    /// the control limits are invalid.
    pub fn validate(&self) -> Result<()> {
        ConfigError::check_positive("mass", self.mass)?;
        ConfigError::check_positive("planning_dt", self.planning_dt)?;
        ConfigError::check_positive("arrival_radius", self.arrival_radius)?;
        for (name, value) in ["inertia_xx", "inertia_yy", "inertia_zz"]
            .into_iter()
            .zip(self.inertia.diagonal().iter())
        {
            ConfigError::check_positive(name, *value)?;
        }
        if self.inertia.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::InvalidParameter("inertia must be finite".into()).into());
        }
        self.limits.validate()
    }
}

/// A quadcopter flying through a queue of waypoints.
///
/// Each [`step`](Self::step) asks the flight controller for accelerations
/// once, holds them constant across the integration step, then drops every
/// waypoint it has reached. The last waypoint reached stays as a hover
/// target, so a finished vehicle holds position instead of drifting.
#[derive(Debug, Clone)]
pub struct Vehicle {
    state: RigidBodyState,
    params: VehicleParams,
    controller: FlightController,
    waypoints: VecDeque<Point3>,
    hold: Option<Point3>,
    last_command: Accelerations,
    motors: Vec<Motor>,
    allocator: ThrustAllocator,
}

impl Vehicle {
    /// Creates a vehicle with no waypoints; it hovers where it starts.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` fails validation.
    pub fn new(state: RigidBodyState, params: VehicleParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            state,
            params,
            controller: FlightController::new(params.limits),
            waypoints: VecDeque::new(),
            hold: None,
            last_command: Accelerations::default(),
            motors: Vec::new(),
            allocator: ThrustAllocator::default(),
        })
    }

    /// Attaches motors, which [`step`](Self::step) keeps allocated to the
    /// commanded force and torque.
    #[must_use]
    pub fn with_motors(mut self, motors: Vec<Motor>, allocator: ThrustAllocator) -> Self {
        self.motors = motors;
        self.allocator = allocator;
        self
    }

    #[must_use]
    pub fn state(&self) -> &RigidBodyState {
        &self.state
    }

    #[must_use]
    pub fn params(&self) -> &VehicleParams {
        &self.params
    }

    #[must_use]
    pub fn motors(&self) -> &[Motor] {
        &self.motors
    }

    /// Accelerations commanded on the most recent step. The linear part is
    /// thrust only.
    #[must_use]
    pub fn last_command(&self) -> &Accelerations {
        &self.last_command
    }

    /// Replaces any queued waypoints with a single goal.
    pub fn set_goal(&mut self, goal: Point3) {
        self.waypoints.clear();
        self.waypoints.push_back(goal);
    }

    /// Replaces any queued waypoints with the points of `path`.
    pub fn follow(&mut self, path: &Path) {
        self.waypoints.clear();
        self.waypoints.extend(path.points().iter().copied());
        self.advance_waypoints();
    }

    /// The waypoint currently being flown toward.
    #[must_use]
    pub fn current_waypoint(&self) -> Option<&Point3> {
        self.waypoints.front()
    }

    /// Waypoints not yet reached, in order.
    #[must_use]
    pub fn remaining_waypoints(&self) -> impl Iterator<Item = &Point3> + '_ {
        self.waypoints.iter()
    }

    /// Whether every queued waypoint has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Point the controller currently steers toward.
    #[must_use]
    pub fn target(&self) -> Point3 {
        self.waypoints
            .front()
            .or(self.hold.as_ref())
            .copied()
            .unwrap_or(self.state.position)
    }

    /// Advances the vehicle by `dt` seconds under `gravity`.
    pub fn step(&mut self, dt: f64, policy: IntegrationPolicy, gravity: &Vector3) {
        self.advance_waypoints();

        let request = ControlRequest::new(self.target(), self.params.planning_dt)
            .with_mass(self.params.mass)
            .with_external_acceleration(*gravity);
        let command = self.controller.compute_accelerations(&self.state, &request);
        self.last_command = command;
        if !self.motors.is_empty() {
            self.allocate_motors(dt);
        }

        let total = Accelerations::new(command.linear + gravity, command.angular);
        self.state = integrate(&self.state, dt, |_, _: &RigidBodyState| total, policy);

        self.advance_waypoints();
    }

    /// World-frame thrust force behind the last command.
    #[must_use]
    pub fn required_force(&self) -> Vector3 {
        self.last_command.linear * self.params.mass
    }

    /// World-frame torque needed to produce the last commanded angular
    /// acceleration, including the gyroscopic term.
    #[must_use]
    pub fn required_torque(&self) -> Vector3 {
        let rotation = &self.state.rotation;
        let world_inertia = rotation * self.params.inertia * rotation.transpose();
        let omega = &self.state.angular_velocity;
        world_inertia * self.last_command.angular + omega.cross(&(world_inertia * omega))
    }

    /// Re-allocates motor thrusts to the last command and returns the
    /// updated motors.
    pub fn allocate_motors(&mut self, dt: f64) -> &[Motor] {
        let to_body = self.state.rotation.transpose();
        let force = to_body * self.required_force();
        let torque = to_body * self.required_torque();
        let thrusts = self.allocator.allocate(&self.motors, &force, &torque, dt);
        for (motor, thrust) in self.motors.iter_mut().zip(thrusts) {
            motor.set_thrust(thrust);
        }
        &self.motors
    }

    fn advance_waypoints(&mut self) {
        let radius = self.params.arrival_radius;
        while let Some(&waypoint) = self.waypoints.front() {
            if (waypoint - self.state.position).norm() > radius {
                break;
            }
            self.waypoints.pop_front();
            self.hold = Some(waypoint);
            debug!(
                x = waypoint.x,
                y = waypoint.y,
                z = waypoint.z,
                remaining = self.waypoints.len(),
                "waypoint reached"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::control::quad_x_layout;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    fn gravity() -> Vector3 {
        v(0.0, -9.81, 0.0)
    }

    fn test_params() -> VehicleParams {
        VehicleParams {
            limits: ControlLimits {
                max_speed: 5.0,
                close_range: 2.0,
                max_thrust: 30.0,
                ..ControlLimits::default()
            },
            ..VehicleParams::default()
        }
    }

    #[test]
    fn flies_to_goal() {
        let mut vehicle = Vehicle::new(RigidBodyState::default(), test_params()).unwrap();
        vehicle.set_goal(p(10.0, 0.0, 0.0));
        for _ in 0..3000 {
            vehicle.step(0.01, IntegrationPolicy::Rk4, &gravity());
        }
        assert!(vehicle.is_finished());
        let distance = (vehicle.state().position - p(10.0, 0.0, 0.0)).norm();
        assert!(distance < 0.5, "distance {distance}");
        assert!(vehicle.state().is_orthonormal(1e-6));
    }

    #[test]
    fn hovers_without_goal() {
        let mut vehicle = Vehicle::new(RigidBodyState::at_rest(p(0.0, 5.0, 0.0)), test_params()).unwrap();
        for _ in 0..500 {
            vehicle.step(0.01, IntegrationPolicy::SemiImplicitEuler, &gravity());
        }
        assert_relative_eq!(vehicle.state().position, p(0.0, 5.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn follows_path_in_order() {
        let path = Path::new(
            vec![p(0.0, 0.0, 0.0), p(5.0, 0.0, 0.0), p(5.0, 5.0, 0.0)],
            vec![0, 2, 1],
            10.0,
        );
        let mut vehicle = Vehicle::new(RigidBodyState::default(), test_params()).unwrap();
        vehicle.follow(&path);
        // The start point is already reached.
        assert_eq!(vehicle.current_waypoint(), Some(&p(5.0, 0.0, 0.0)));
        assert_eq!(vehicle.remaining_waypoints().count(), 2);

        let mut reached_corner = false;
        for _ in 0..4000 {
            vehicle.step(0.01, IntegrationPolicy::Rk4, &gravity());
            if vehicle.current_waypoint() == Some(&p(5.0, 5.0, 0.0)) {
                reached_corner = true;
            }
        }
        assert!(reached_corner);
        assert!(vehicle.is_finished());
        assert!((vehicle.state().position - p(5.0, 5.0, 0.0)).norm() < 0.5);
    }

    #[test]
    fn hover_force_matches_weight() {
        let mut vehicle = Vehicle::new(RigidBodyState::default(), test_params()).unwrap();
        vehicle.step(0.01, IntegrationPolicy::Rk4, &gravity());
        assert_relative_eq!(vehicle.required_force(), v(0.0, 9.81, 0.0), epsilon = 1e-9);
        assert_relative_eq!(vehicle.required_torque(), Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn torque_includes_gyroscopic_term() {
        let params = VehicleParams {
            inertia: Matrix3::from_diagonal(&v(1.0, 2.0, 3.0)),
            ..test_params()
        };
        let state = RigidBodyState::default().with_angular_velocity(v(1.0, 1.0, 0.0));
        let vehicle = Vehicle::new(state, params).unwrap();
        // No command yet: torque is w x (I w) = (1,1,0) x (1,2,0).
        assert_relative_eq!(vehicle.required_torque(), v(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn motors_track_hover_thrust() {
        let motors = quad_x_layout(0.25, 0.0, 10.0).unwrap();
        let mut vehicle = Vehicle::new(RigidBodyState::default(), test_params())
            .unwrap()
            .with_motors(motors, ThrustAllocator::default());
        for _ in 0..10 {
            vehicle.step(0.01, IntegrationPolicy::Rk4, &gravity());
        }
        let total: f64 = vehicle.motors().iter().map(Motor::thrust).sum();
        assert!((total - 9.81).abs() < 0.1, "total {total}");
    }

    #[test]
    fn invalid_params_rejected() {
        let params = VehicleParams {
            mass: 0.0,
            ..VehicleParams::default()
        };
        assert!(Vehicle::new(RigidBodyState::default(), params).is_err());
        let params = VehicleParams {
            inertia: Matrix3::zeros(),
            ..VehicleParams::default()
        };
        assert!(params.validate().is_err());
    }
}
