use tracing::debug;

use crate::dynamics::IntegrationPolicy;
use crate::error::{ConfigError, Result};
use crate::math::Vector3;

use super::Vehicle;

/// Global settings shared by every vehicle in a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// World-frame gravitational acceleration.
    pub gravity: Vector3,
    /// Integration step, seconds.
    pub dt: f64,
    pub policy: IntegrationPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.81, 0.0),
            dt: 0.01,
            policy: IntegrationPolicy::Rk4,
        }
    }
}

impl SimulationConfig {
    /// # Errors
    ///
    /// Returns an error if `dt` is not positive or gravity is not finite.
    pub fn validate(&self) -> Result<()> {
        ConfigError::check_positive("dt", self.dt)?;
        if self.gravity.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::InvalidParameter("gravity must be finite".into()).into());
        }
        Ok(())
    }
}

/// A fixed set of independent vehicles advanced in lockstep.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    vehicles: Vec<Vehicle>,
    elapsed: f64,
    ticks: u64,
}

impl Simulation {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            vehicles: Vec::new(),
            elapsed: 0.0,
            ticks: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Adds a vehicle and returns its index.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> usize {
        self.vehicles.push(vehicle);
        self.vehicles.len() - 1
    }

    #[must_use]
    pub fn vehicle(&self, index: usize) -> Option<&Vehicle> {
        self.vehicles.get(index)
    }

    pub fn vehicle_mut(&mut self, index: usize) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(index)
    }

    #[must_use]
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Simulated seconds since creation.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Steps every vehicle once by the configured `dt`.
    pub fn tick(&mut self) {
        let SimulationConfig { gravity, dt, policy } = self.config;
        for vehicle in &mut self.vehicles {
            vehicle.step(dt, policy, &gravity);
        }
        self.elapsed += dt;
        self.ticks += 1;
    }

    /// Ticks until every vehicle has finished its waypoints or `max_ticks`
    /// have run. Returns whether all vehicles finished.
    pub fn run_until_finished(&mut self, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if self.all_finished() {
                break;
            }
            self.tick();
        }
        let finished = self.all_finished();
        debug!(ticks = self.ticks, elapsed = self.elapsed, finished, "simulation run");
        finished
    }

    /// Whether every vehicle has reached its last waypoint.
    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.vehicles.iter().all(Vehicle::is_finished)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::control::ControlLimits;
    use crate::dynamics::RigidBodyState;
    use crate::math::Point3;
    use crate::vehicle::VehicleParams;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn vehicle_at(position: Point3, goal: Point3) -> Vehicle {
        let params = VehicleParams {
            limits: ControlLimits {
                max_speed: 5.0,
                close_range: 2.0,
                max_thrust: 30.0,
                ..ControlLimits::default()
            },
            ..VehicleParams::default()
        };
        let mut vehicle = Vehicle::new(RigidBodyState::at_rest(position), params).unwrap();
        vehicle.set_goal(goal);
        vehicle
    }

    #[test]
    fn tick_advances_clock() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        for _ in 0..50 {
            sim.tick();
        }
        assert_eq!(sim.ticks(), 50);
        assert_relative_eq!(sim.elapsed(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn vehicles_fly_independently() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let a = sim.add_vehicle(vehicle_at(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)));
        let b = sim.add_vehicle(vehicle_at(p(0.0, 0.0, 20.0), p(0.0, 8.0, 20.0)));
        assert!(!sim.all_finished());
        assert!(sim.run_until_finished(5000));

        for _ in 0..1000 {
            sim.tick();
        }
        let a = sim.vehicle(a).unwrap().state().position;
        let b = sim.vehicle(b).unwrap().state().position;
        assert!((a - p(10.0, 0.0, 0.0)).norm() < 0.5);
        assert!((b - p(0.0, 8.0, 20.0)).norm() < 0.5);
    }

    #[test]
    fn euler_policy_also_arrives() {
        let config = SimulationConfig {
            policy: IntegrationPolicy::SemiImplicitEuler,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        sim.add_vehicle(vehicle_at(p(0.0, 0.0, 0.0), p(-6.0, 3.0, 4.0)));
        assert!(sim.run_until_finished(5000));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = SimulationConfig {
            dt: 0.0,
            ..SimulationConfig::default()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn vehicle_mut_retargets() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let id = sim.add_vehicle(vehicle_at(p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.0)));
        sim.tick();
        assert!(sim.all_finished());
        sim.vehicle_mut(id).unwrap().set_goal(p(0.0, 0.0, -5.0));
        assert!(!sim.all_finished());
        assert!(sim.run_until_finished(3000));
    }
}
