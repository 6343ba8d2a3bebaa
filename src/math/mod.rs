mod aabb;
pub mod rotation;

pub use aabb::Aabb;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix type, used for rotations and inertia tensors.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Unit quaternion type.
pub type UnitQuaternion = nalgebra::UnitQuaternion<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// World up axis. The world frame is Y-up; vehicles look down their local -Z.
#[must_use]
pub fn world_up() -> Vector3 {
    Vector3::y()
}

/// Normalizes `v`, or returns `fallback` when `v` is too short to have a direction.
#[must_use]
pub fn normalize_or(v: &Vector3, fallback: Vector3) -> Vector3 {
    v.try_normalize(TOLERANCE).unwrap_or(fallback)
}

/// Returns a unit vector perpendicular to `v`.
///
/// For a zero vector the result is the X axis.
#[must_use]
pub fn any_perpendicular(v: &Vector3) -> Vector3 {
    let Some(n) = v.try_normalize(TOLERANCE) else {
        return Vector3::x();
    };
    // Choose a reference vector not parallel to `n`
    let reference = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    n.cross(&reference).normalize()
}

/// Unsigned angle between two vectors in `[0, pi]`.
///
/// Uses `atan2` so nearly (anti-)parallel inputs stay accurate. Returns zero
/// if either vector is zero-length.
#[must_use]
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Scales `v` so its length is at most `max_len`, preserving direction.
#[must_use]
pub fn clamp_length(v: &Vector3, max_len: f64) -> Vector3 {
    let len = v.norm();
    if len > max_len && len > TOLERANCE {
        v * (max_len / len)
    } else {
        *v
    }
}

/// Projects a matrix onto a nearby rotation (unit, mutually orthogonal,
/// right-handed columns) using Gram-Schmidt on the first two columns.
///
/// Degenerate columns fall back to the identity axes, so the result is always
/// a proper rotation.
#[must_use]
pub fn orthonormalize(m: &Matrix3) -> Matrix3 {
    let x = normalize_or(&m.column(0).into_owned(), Vector3::x());
    let c1 = m.column(1).into_owned();
    let y_raw = c1 - x * x.dot(&c1);
    let y = match y_raw.try_normalize(TOLERANCE) {
        Some(y) => y,
        None => {
            // Column 1 collapsed onto column 0; rebuild from column 2.
            let c2 = m.column(2).into_owned();
            let z_hint = normalize_or(&(c2 - x * x.dot(&c2)), any_perpendicular(&x));
            z_hint.cross(&x)
        }
    };
    let z = x.cross(&y);
    Matrix3::from_columns(&[x, y, z])
}

/// Largest deviation of `m` from orthonormality: the worst of
/// `| |c_i| - 1 |` and `|c_i . c_j|` over its columns.
#[must_use]
pub fn orthonormality_error(m: &Matrix3) -> f64 {
    let cols = [
        m.column(0).into_owned(),
        m.column(1).into_owned(),
        m.column(2).into_owned(),
    ];
    let mut worst = 0.0_f64;
    for (i, a) in cols.iter().enumerate() {
        worst = worst.max((a.norm() - 1.0).abs());
        for b in &cols[i + 1..] {
            worst = worst.max(a.dot(b).abs());
        }
    }
    worst
}
