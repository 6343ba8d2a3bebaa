//! Plans a route around a wall and flies a quadcopter along it.
//!
//! Usage:
//! ```text
//! cargo run --example fly_route                 # default seed
//! cargo run --example fly_route -- 42           # custom seed
//! RUST_LOG=quadnav=debug cargo run --example fly_route
//! ```

use quadnav::control::{quad_x_layout, ThrustAllocator};
use quadnav::math::{Aabb, Point3};
use quadnav::roadmap::BuildRoadmap;
use quadnav::visibility::BoxObstacles;
use quadnav::{plan_route, QuadnavError, RigidBodyState, Simulation, SimulationConfig, Vehicle, VehicleParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

const MAX_TICKS: u64 = 20_000;

fn main() -> Result<(), QuadnavError> {
    // Default: WARN for everything, INFO for quadnav and this demo.
    // Override with RUST_LOG (e.g. RUST_LOG=quadnav=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("fly_route=info".parse().unwrap_or_default())
        .add_directive("quadnav=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(7_u64);
    let mut rng = StdRng::seed_from_u64(seed);

    let wall = Aabb::new(Point3::new(-2.0, 0.0, -12.0), Point3::new(2.0, 14.0, 12.0))?;
    let scene = BoxObstacles::new(vec![wall]).with_clearance(0.5);

    let start = Point3::new(-15.0, 2.0, 0.0);
    let goal = Point3::new(15.0, 2.0, 0.0);
    let bounds = Aabb::new(Point3::new(-20.0, 0.0, -20.0), Point3::new(20.0, 20.0, 20.0))?;
    let path = plan_route(&BuildRoadmap::new(bounds, 200, start, goal), &scene, &mut rng)?;
    info!(
        waypoints = path.len(),
        length = path.total_length(),
        seed,
        "route planned"
    );
    for (i, point) in path.points().iter().enumerate() {
        info!(i, x = point.x, y = point.y, z = point.z, "waypoint");
    }

    let motors = quad_x_layout(0.25, 0.0, 12.0)?;
    let mut vehicle = Vehicle::new(RigidBodyState::at_rest(start), VehicleParams::default())?
        .with_motors(motors, ThrustAllocator::default());
    vehicle.follow(&path);

    let mut sim = Simulation::new(SimulationConfig::default())?;
    let id = sim.add_vehicle(vehicle);
    let finished = sim.run_until_finished(MAX_TICKS);

    if let Some(vehicle) = sim.vehicle(id) {
        let position = vehicle.state().position;
        let thrusts: Vec<f64> = vehicle.motors().iter().map(|m| m.thrust()).collect();
        info!(
            elapsed = sim.elapsed(),
            x = position.x,
            y = position.y,
            z = position.z,
            miss = (position - goal).norm(),
            ?thrusts,
            "flight ended"
        );
    }
    if !finished {
        warn!(ticks = MAX_TICKS, "vehicle did not reach the goal");
    }
    Ok(())
}
