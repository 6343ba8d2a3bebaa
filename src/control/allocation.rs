//! Splitting a desired body force and torque across individual motors.
//!
//! The allocator runs a coordinate hill-climb: each pass tries nudging every
//! motor up or down by the current step, keeps the first nudge that lowers
//! the cost, and halves the step when a whole pass finds nothing. The cost is
//!
//! ```text
//! force_weight * |F - F_desired|^2 + torque_weight * |T - T_desired|^2
//! ```
//!
//! where `F` and `T` are the net force and torque of all motors. Each motor
//! stays within its thrust range and within `max_thrust_rate * dt` of its
//! current thrust.

use tracing::trace;

use crate::error::{ConfigError, Result};
use crate::math::{Vector3, TOLERANCE};

/// Yaw reaction torque per newton of thrust used by [`quad_x_layout`].
const QUAD_REACTION_TORQUE: f64 = 0.016;

/// A fixed rotor, described in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Motor {
    offset: Vector3,
    direction: Vector3,
    thrust: f64,
    min_thrust: f64,
    max_thrust: f64,
    reaction_torque: f64,
}

impl Motor {
    /// Creates a motor at `offset` from the centre of mass pushing along
    /// `direction`. Its current thrust starts at `min_thrust`.
    ///
    /// # Errors
    ///
    /// Returns an error if `direction` has zero length or the thrust range
    /// is empty or non-finite.
    pub fn new(offset: Vector3, direction: Vector3, min_thrust: f64, max_thrust: f64) -> Result<Self> {
        let direction = direction
            .try_normalize(TOLERANCE)
            .ok_or_else(|| ConfigError::InvalidParameter("motor direction has zero length".into()))?;
        ConfigError::check_non_negative("min_thrust", min_thrust)?;
        ConfigError::check_positive("max_thrust", max_thrust)?;
        if min_thrust > max_thrust {
            return Err(ConfigError::InvalidLimit {
                name: "min_thrust",
                value: min_thrust,
                requirement: "at most max_thrust",
            }
            .into());
        }
        Ok(Self {
            offset,
            direction,
            thrust: min_thrust,
            min_thrust,
            max_thrust,
            reaction_torque: 0.0,
        })
    }

    /// Sets the torque about `direction` produced per newton of thrust by
    /// the spinning rotor. The sign encodes the spin direction.
    #[must_use]
    pub fn with_reaction_torque(mut self, coefficient: f64) -> Self {
        self.reaction_torque = coefficient;
        self
    }

    #[must_use]
    pub fn offset(&self) -> &Vector3 {
        &self.offset
    }

    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    #[must_use]
    pub fn thrust(&self) -> f64 {
        self.thrust
    }

    #[must_use]
    pub fn thrust_range(&self) -> (f64, f64) {
        (self.min_thrust, self.max_thrust)
    }

    #[must_use]
    pub fn reaction_torque(&self) -> f64 {
        self.reaction_torque
    }

    /// Sets the current thrust, clamped to the motor's range.
    pub fn set_thrust(&mut self, thrust: f64) {
        self.thrust = thrust.max(self.min_thrust).min(self.max_thrust);
    }

    /// Body torque produced per newton of thrust.
    #[must_use]
    pub fn torque_per_newton(&self) -> Vector3 {
        self.offset.cross(&self.direction) + self.direction * self.reaction_torque
    }

    /// Body force at the current thrust.
    #[must_use]
    pub fn force(&self) -> Vector3 {
        self.direction * self.thrust
    }

    /// Body torque at the current thrust.
    #[must_use]
    pub fn torque(&self) -> Vector3 {
        self.torque_per_newton() * self.thrust
    }
}

/// Tunables for [`ThrustAllocator`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationParams {
    /// Weight of squared force error, per N^2.
    pub force_weight: f64,
    /// Weight of squared torque error, per (N m)^2.
    pub torque_weight: f64,
    /// First hill-climb step, newtons.
    pub initial_step: f64,
    /// The search stops once the step halves below this.
    pub min_step: f64,
    /// Upper bound on hill-climb passes.
    pub max_iterations: usize,
    /// Fastest change of a single motor's thrust, newtons per second.
    pub max_thrust_rate: f64,
}

impl Default for AllocationParams {
    fn default() -> Self {
        Self {
            force_weight: 1.0,
            torque_weight: 10.0,
            initial_step: 0.5,
            min_step: 1e-4,
            max_iterations: 500,
            max_thrust_rate: 100.0,
        }
    }
}

impl AllocationParams {
    /// # Errors
    ///
    /// Returns an error if a weight is negative, a step or rate is not
    /// positive, `min_step` exceeds `initial_step`, or no iterations are
    /// allowed.
    pub fn validate(&self) -> Result<()> {
        ConfigError::check_non_negative("force_weight", self.force_weight)?;
        ConfigError::check_non_negative("torque_weight", self.torque_weight)?;
        ConfigError::check_positive("initial_step", self.initial_step)?;
        ConfigError::check_positive("min_step", self.min_step)?;
        ConfigError::check_positive("max_thrust_rate", self.max_thrust_rate)?;
        if self.min_step > self.initial_step {
            return Err(ConfigError::InvalidLimit {
                name: "min_step",
                value: self.min_step,
                requirement: "at most initial_step",
            }
            .into());
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter("max_iterations must be at least 1".into()).into());
        }
        Ok(())
    }
}

/// Hill-climbing motor thrust allocator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThrustAllocator {
    params: AllocationParams,
}

impl ThrustAllocator {
    /// Creates an allocator. `params` should have passed
    /// [`AllocationParams::validate`].
    #[must_use]
    pub fn new(params: AllocationParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &AllocationParams {
        &self.params
    }

    /// Chooses a thrust for each motor so their combined body force and
    /// torque approach `force` and `torque`.
    ///
    /// The search starts from each motor's current thrust and may move it by
    /// at most `max_thrust_rate * dt`. The result has one entry per motor, in
    /// order; the motors themselves are not modified.
    #[must_use]
    pub fn allocate(&self, motors: &[Motor], force: &Vector3, torque: &Vector3, dt: f64) -> Vec<f64> {
        let slew = self.params.max_thrust_rate * dt.max(0.0);
        let mut thrusts = Vec::with_capacity(motors.len());
        let mut bounds = Vec::with_capacity(motors.len());
        let mut net_force = Vector3::zeros();
        let mut net_torque = Vector3::zeros();
        for motor in motors {
            let start = motor.thrust.max(motor.min_thrust).min(motor.max_thrust);
            let lo = motor.min_thrust.max(start - slew);
            let hi = motor.max_thrust.min(start + slew);
            net_force += motor.direction * start;
            net_torque += motor.torque_per_newton() * start;
            thrusts.push(start);
            bounds.push((lo, hi));
        }
        let per_newton: Vec<(Vector3, Vector3)> = motors
            .iter()
            .map(|m| (m.direction, m.torque_per_newton()))
            .collect();

        let mut best = self.cost(&net_force, &net_torque, force, torque);
        let mut step = self.params.initial_step;
        let mut iterations = 0;
        while step >= self.params.min_step && iterations < self.params.max_iterations {
            iterations += 1;
            let mut improved = false;
            for (i, thrust) in thrusts.iter_mut().enumerate() {
                let (lo, hi) = bounds[i];
                let (unit_force, unit_torque) = per_newton[i];
                for delta in [step, -step] {
                    let change = (*thrust + delta).max(lo).min(hi) - *thrust;
                    if change.abs() < TOLERANCE {
                        continue;
                    }
                    let trial_force = net_force + unit_force * change;
                    let trial_torque = net_torque + unit_torque * change;
                    let cost = self.cost(&trial_force, &trial_torque, force, torque);
                    if cost < best {
                        best = cost;
                        net_force = trial_force;
                        net_torque = trial_torque;
                        *thrust += change;
                        improved = true;
                        break;
                    }
                }
            }
            if !improved {
                step *= 0.5;
            }
        }

        trace!(motors = motors.len(), iterations, cost = best, "motor allocation");
        thrusts
    }

    /// Cost of a set of thrusts against the desired force and torque.
    #[must_use]
    pub fn cost_of(&self, motors: &[Motor], thrusts: &[f64], force: &Vector3, torque: &Vector3) -> f64 {
        let (net_force, net_torque) = motors.iter().zip(thrusts).fold(
            (Vector3::zeros(), Vector3::zeros()),
            |(f, t), (motor, &thrust)| (f + motor.direction * thrust, t + motor.torque_per_newton() * thrust),
        );
        self.cost(&net_force, &net_torque, force, torque)
    }

    fn cost(&self, net_force: &Vector3, net_torque: &Vector3, force: &Vector3, torque: &Vector3) -> f64 {
        self.params.force_weight * (net_force - force).norm_squared()
            + self.params.torque_weight * (net_torque - torque).norm_squared()
    }
}

/// Four upward-pushing motors in an X pattern in the body's horizontal
/// plane, `arm_length` from the centre. Diagonal pairs spin the same way so
/// their reaction torques cancel at equal thrust.
///
/// Order: front-right, back-left, front-left, back-right (front is -Z).
///
/// # Errors
///
/// Returns an error if `arm_length` is not positive or the thrust range is
/// invalid.
pub fn quad_x_layout(arm_length: f64, min_thrust: f64, max_thrust: f64) -> Result<Vec<Motor>> {
    ConfigError::check_positive("arm_length", arm_length)?;
    let h = arm_length * std::f64::consts::FRAC_1_SQRT_2;
    let up = Vector3::y();
    [
        (Vector3::new(h, 0.0, -h), QUAD_REACTION_TORQUE),
        (Vector3::new(-h, 0.0, h), QUAD_REACTION_TORQUE),
        (Vector3::new(-h, 0.0, -h), -QUAD_REACTION_TORQUE),
        (Vector3::new(h, 0.0, h), -QUAD_REACTION_TORQUE),
    ]
    .into_iter()
    .map(|(offset, reaction)| Ok(Motor::new(offset, up, min_thrust, max_thrust)?.with_reaction_torque(reaction)))
    .collect()
}
