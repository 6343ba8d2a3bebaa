use crate::math::{orthonormalize, Matrix3, Vector3};

use super::{Accelerations, RigidBodyState};

/// Numerical scheme used to advance a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegrationPolicy {
    /// Velocity first, then position and orientation from the new velocity.
    SemiImplicitEuler,
    /// Classic fourth-order Runge-Kutta.
    #[default]
    Rk4,
}

impl IntegrationPolicy {
    /// Advances `state` by `dt`. See [`integrate`].
    pub fn step<F>(self, state: &RigidBodyState, dt: f64, accelerations: F) -> RigidBodyState
    where
        F: FnMut(f64, &RigidBodyState) -> Accelerations,
    {
        match self {
            Self::SemiImplicitEuler => semi_implicit_euler(state, dt, accelerations),
            Self::Rk4 => rk4(state, dt, accelerations),
        }
    }
}

/// Advances `state` by `dt` seconds.
///
/// `accelerations(t, s)` returns the world-frame linear and angular
/// acceleration at time offset `t` within the step for the trial state `s`.
/// The returned state always has an orthonormal rotation.
pub fn integrate<F>(
    state: &RigidBodyState,
    dt: f64,
    accelerations: F,
    policy: IntegrationPolicy,
) -> RigidBodyState
where
    F: FnMut(f64, &RigidBodyState) -> Accelerations,
{
    policy.step(state, dt, accelerations)
}

fn semi_implicit_euler<F>(state: &RigidBodyState, dt: f64, mut accelerations: F) -> RigidBodyState
where
    F: FnMut(f64, &RigidBodyState) -> Accelerations,
{
    let acc = accelerations(0.0, state);
    let velocity = state.velocity + acc.linear * dt;
    let angular_velocity = state.angular_velocity + acc.angular * dt;
    let position = state.position + velocity * dt;
    let rotation =
        orthonormalize(&(state.rotation + angular_velocity.cross_matrix() * state.rotation * dt));
    RigidBodyState {
        position,
        rotation,
        velocity,
        angular_velocity,
    }
}

/// Time derivative of a rigid-body state.
#[derive(Debug, Clone, Copy)]
struct Derivative {
    position: Vector3,
    velocity: Vector3,
    rotation: Matrix3,
    angular_velocity: Vector3,
}

impl Derivative {
    fn at<F>(state: &RigidBodyState, t: f64, accelerations: &mut F) -> Self
    where
        F: FnMut(f64, &RigidBodyState) -> Accelerations,
    {
        let acc = accelerations(t, state);
        Self {
            position: state.velocity,
            velocity: acc.linear,
            // dR/dt = [w]x R for a world-frame angular velocity.
            rotation: state.angular_velocity.cross_matrix() * state.rotation,
            angular_velocity: acc.angular,
        }
    }
}

/// Trial state `base + d * h`, with the rotation pulled back onto SO(3).
fn advance(base: &RigidBodyState, d: &Derivative, h: f64) -> RigidBodyState {
    RigidBodyState {
        position: base.position + d.position * h,
        rotation: orthonormalize(&(base.rotation + d.rotation * h)),
        velocity: base.velocity + d.velocity * h,
        angular_velocity: base.angular_velocity + d.angular_velocity * h,
    }
}

fn rk4<F>(state: &RigidBodyState, dt: f64, mut accelerations: F) -> RigidBodyState
where
    F: FnMut(f64, &RigidBodyState) -> Accelerations,
{
    let half = dt * 0.5;

    let k1 = Derivative::at(state, 0.0, &mut accelerations);
    let k2 = Derivative::at(&advance(state, &k1, half), half, &mut accelerations);
    let k3 = Derivative::at(&advance(state, &k2, half), half, &mut accelerations);
    let k4 = Derivative::at(&advance(state, &k3, dt), dt, &mut accelerations);

    let combined = Derivative {
        position: (k1.position + (k2.position + k3.position) * 2.0 + k4.position) / 6.0,
        velocity: (k1.velocity + (k2.velocity + k3.velocity) * 2.0 + k4.velocity) / 6.0,
        rotation: (k1.rotation + (k2.rotation + k3.rotation) * 2.0 + k4.rotation) / 6.0,
        angular_velocity: (k1.angular_velocity
            + (k2.angular_velocity + k3.angular_velocity) * 2.0
            + k4.angular_velocity)
            / 6.0,
    };
    advance(state, &combined, dt)
}
