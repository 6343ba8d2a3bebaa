//! Roadmap path planning and flight simulation for quadcopters.
//!
//! A probabilistic roadmap is sampled inside a bounding box and connected
//! wherever a [`VisibilityOracle`](visibility::VisibilityOracle) reports a
//! clear line of sight. A* finds the shortest route through it, and a
//! stateless flight controller turns each waypoint into bounded thrust and
//! rotation commands that a rigid-body integrator plays forward.

pub mod control;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod planning;
pub mod roadmap;
pub mod vehicle;
pub mod visibility;

pub use control::{control_step, ControlLimits};
pub use dynamics::{integrate, IntegrationPolicy, RigidBodyState};
pub use error::{QuadnavError, Result};
pub use planning::{plan_path, plan_route, Path};
pub use roadmap::{build_roadmap, Roadmap};
pub use vehicle::{Simulation, SimulationConfig, Vehicle, VehicleParams};
pub use visibility::VisibilityOracle;
