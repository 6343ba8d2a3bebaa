mod allocation;
mod flight;

pub use allocation::{quad_x_layout, AllocationParams, Motor, ThrustAllocator};
pub use flight::{control_step, ControlRequest, FlightController};

use std::f64::consts::PI;

use crate::error::{ConfigError, Result};

/// Physical limits the flight controller respects.
///
/// Thrust limits are forces (newtons); the controller divides them by the
/// vehicle mass. Angles are in radians, rates in radians per second.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlLimits {
    /// Fastest commanded linear speed.
    pub max_speed: f64,
    /// Largest angle between the thrust axis and world up.
    pub max_tilt_angle: f64,
    /// Fastest commanded angular speed.
    pub max_roll_rate: f64,
    /// Attitude errors below this angle are ignored. Also used as the
    /// parallelism threshold when choosing a look direction.
    pub max_angle_error: f64,
    /// Largest total thrust.
    pub max_thrust: f64,
    /// Smallest total thrust; rotors never fully stop.
    pub min_thrust: f64,
    /// Within this distance of the goal, speed and turn rate ramp down.
    pub close_range: f64,
}

impl Default for ControlLimits {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            max_tilt_angle: PI / 6.0,
            max_roll_rate: PI,
            max_angle_error: 0.01,
            max_thrust: 40.0,
            min_thrust: 1.0,
            close_range: 5.0,
        }
    }
}

impl ControlLimits {
    /// Checks that the limits are usable together.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is non-finite or out of range, or if
    /// `min_thrust` exceeds `max_thrust`.
    pub fn validate(&self) -> Result<()> {
        ConfigError::check_positive("max_speed", self.max_speed)?;
        ConfigError::check_positive("max_tilt_angle", self.max_tilt_angle)?;
        ConfigError::check_positive("max_roll_rate", self.max_roll_rate)?;
        ConfigError::check_positive("max_angle_error", self.max_angle_error)?;
        ConfigError::check_positive("max_thrust", self.max_thrust)?;
        ConfigError::check_non_negative("min_thrust", self.min_thrust)?;
        ConfigError::check_positive("close_range", self.close_range)?;
        if self.max_tilt_angle >= PI {
            return Err(ConfigError::InvalidLimit {
                name: "max_tilt_angle",
                value: self.max_tilt_angle,
                requirement: "below pi",
            }
            .into());
        }
        if self.min_thrust > self.max_thrust {
            return Err(ConfigError::InvalidLimit {
                name: "min_thrust",
                value: self.min_thrust,
                requirement: "at most max_thrust",
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ControlLimits::default().validate().is_ok());
    }

    #[test]
    fn inverted_thrust_range_rejected() {
        let limits = ControlLimits {
            min_thrust: 50.0,
            ..ControlLimits::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn nan_speed_rejected() {
        let limits = ControlLimits {
            max_speed: f64::NAN,
            ..ControlLimits::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn tilt_of_pi_rejected() {
        let limits = ControlLimits {
            max_tilt_angle: PI,
            ..ControlLimits::default()
        };
        assert!(limits.validate().is_err());
    }
}
