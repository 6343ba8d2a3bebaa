//! Rotation helpers for body frames.
//!
//! A body rotation matrix maps body axes to world axes. Its columns are the
//! body's right (+X), up (+Y) and back (+Z) axes expressed in world space, so
//! the body looks along its local -Z.

use nalgebra::{Rotation3, Unit};

use super::{any_perpendicular, normalize_or, Matrix3, UnitQuaternion, Vector3, TOLERANCE};

/// Rotates `v` about `axis` by `angle` radians (right-hand rule).
///
/// A zero-length axis leaves `v` unchanged.
#[must_use]
pub fn rotate_about(v: &Vector3, axis: &Vector3, angle: f64) -> Vector3 {
    match Unit::try_new(*axis, TOLERANCE) {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle) * v,
        None => *v,
    }
}

/// World-space up axis of a body rotation.
#[must_use]
pub fn body_up(rotation: &Matrix3) -> Vector3 {
    rotation.column(1).into_owned()
}

/// World-space forward axis (local -Z) of a body rotation.
#[must_use]
pub fn body_forward(rotation: &Matrix3) -> Vector3 {
    -rotation.column(2).into_owned()
}

/// Builds a right-handed body rotation whose up axis is `up` and which faces
/// as closely as possible along `look`.
///
/// If `look` lies within `deadband` radians of `up` (or of `-up`), the body
/// faces along `fallback_look` instead. If that is also parallel, any
/// direction perpendicular to `up` is used.
#[must_use]
pub fn look_rotation(up: &Vector3, look: &Vector3, fallback_look: &Vector3, deadband: f64) -> Matrix3 {
    let up = normalize_or(up, super::world_up());
    let look = [look, fallback_look]
        .into_iter()
        .find(|candidate| !is_near_parallel(candidate, &up, deadband))
        .copied()
        .unwrap_or_else(|| any_perpendicular(&up));

    let right = normalize_or(&up.cross(&-look), any_perpendicular(&up));
    let back = right.cross(&up);
    Matrix3::from_columns(&[right, up, back])
}

/// Whether `v` is within `deadband` radians of being parallel or
/// anti-parallel to the unit vector `axis`. Zero vectors count as parallel.
fn is_near_parallel(v: &Vector3, axis: &Vector3, deadband: f64) -> bool {
    let Some(v) = v.try_normalize(TOLERANCE) else {
        return true;
    };
    v.dot(axis).abs() >= deadband.cos()
}

/// Converts an orthonormal rotation matrix to a unit quaternion.
#[must_use]
pub fn to_quaternion(rotation: &Matrix3) -> UnitQuaternion {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation))
}

/// Rotation taking `current` to `target`, expressed in the world frame
/// (`target = diff * current`), with a non-negative scalar part so it
/// describes the shorter of the two equivalent rotations.
#[must_use]
pub fn rotation_difference(current: &Matrix3, target: &Matrix3) -> UnitQuaternion {
    let diff = to_quaternion(target) * to_quaternion(current).inverse();
    if diff.w < 0.0 {
        UnitQuaternion::new_unchecked(-diff.into_inner())
    } else {
        diff
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    use approx::assert_relative_eq;

    use super::*;
    use crate::math::orthonormality_error;

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    #[test]
    fn rotate_x_about_z_gives_y() {
        let r = rotate_about(&v(1.0, 0.0, 0.0), &v(0.0, 0.0, 2.0), FRAC_PI_2);
        assert_relative_eq!(r, v(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn rotate_about_zero_axis_is_identity() {
        let r = rotate_about(&v(1.0, 2.0, 3.0), &Vector3::zeros(), 1.0);
        assert_eq!(r, v(1.0, 2.0, 3.0));
    }

    #[test]
    fn look_rotation_matches_identity_for_default_pose() {
        let m = look_rotation(&v(0.0, 1.0, 0.0), &v(0.0, 0.0, -1.0), &v(1.0, 0.0, 0.0), 0.01);
        assert_relative_eq!(m, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(body_forward(&m), v(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn look_rotation_orthogonalizes_tilted_look() {
        let m = look_rotation(&v(0.0, 1.0, 0.0), &v(1.0, 1.0, 0.0), &v(0.0, 0.0, -1.0), 0.01);
        assert!(orthonormality_error(&m) < 1e-12);
        assert_relative_eq!(body_forward(&m), v(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn look_parallel_to_up_uses_fallback() {
        let m = look_rotation(&v(0.0, 1.0, 0.0), &v(0.0, 5.0, 0.0), &v(1.0, 0.0, 0.0), 0.01);
        assert_relative_eq!(body_forward(&m), v(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn fully_degenerate_look_still_orthonormal() {
        let m = look_rotation(&v(0.0, 1.0, 0.0), &Vector3::zeros(), &v(0.0, -1.0, 0.0), 0.01);
        assert!(orthonormality_error(&m) < 1e-12);
        assert_relative_eq!(body_up(&m), v(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn difference_of_yaw_rotation() {
        let current = Matrix3::identity();
        let target = *Rotation3::from_axis_angle(&Vector3::y_axis(), FRAC_PI_4).matrix();
        let diff = rotation_difference(&current, &target);
        assert_relative_eq!(diff.angle(), FRAC_PI_4, epsilon = 1e-12);
        assert!(diff.w >= 0.0);
        assert_relative_eq!(diff.axis().unwrap().into_inner(), Vector3::y(), epsilon = 1e-12);
    }
}
