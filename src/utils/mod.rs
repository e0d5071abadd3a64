//! Small numeric helpers shared across subsystems.

mod sdp_matrix3;

pub use sdp_matrix3::SdpMatrix3;

use crate::math::{AngVector, Matrix3, Point, Real, Rotation, Vector};

/// `1 / x`, returning `0` instead of `inf`/`NaN` for `x == 0`.
///
/// Several places in the solver divide by an effective mass
/// (`J M^-1 J^t`) that is legitimately zero for a pair of two static or
/// kinematic bodies; propagating a `NaN` through the velocity update
/// would poison the whole island.
#[inline]
pub fn inv(x: Real) -> Real {
    if x == 0.0 {
        0.0
    } else {
        1.0 / x
    }
}

/// Builds an orthonormal basis `(t1, t2)` spanning the plane perpendicular
/// to a (unit) normal, used to seed the two friction tangents of a contact
/// point. Picks the coordinate axis least aligned with `n` to avoid the
/// numerically unstable case of crossing near-parallel vectors.
pub fn perpendicular_basis(n: &Vector) -> (Vector, Vector) {
    let t1 = if n.x.abs() > 0.57735 {
        Vector::new(n.y, -n.x, 0.0)
    } else {
        Vector::new(0.0, n.z, -n.y)
    }
    .normalize();
    let t2 = n.cross(&t1);
    (t1, t2)
}

/// Builds the instantaneous rotation quaternion for an angular-velocity-like
/// vector integrated over one step, `q = exp(omega * dt / 2)`. Ported
/// directly from the original engine's `rotationQuaternion(deltaOrientation)`.
pub fn rotation_quaternion(delta_orientation: AngVector) -> Rotation {
    let angle = delta_orientation.norm();
    if angle < crate::math::DEFAULT_EPSILON {
        Rotation::identity()
    } else {
        Rotation::from_axis_angle(&nalgebra::Unit::new_normalize(delta_orientation), angle)
    }
}

/// Parallel-axis-theorem shift of an inertia tensor already computed about
/// the shape's own centroid, to one computed about `body_origin` instead,
/// for a point mass contribution of `mass` sitting at `offset` from the
/// shape's centroid.
pub fn parallel_axis_shift(mass: Real, offset: Vector) -> Matrix3 {
    let sq = offset.norm_squared();
    let outer = offset * offset.transpose();
    Matrix3::identity() * (sq * mass) - outer * mass
}

/// Computes the area-weighted barycenter, and the signed volume, of a
/// triangle fan from `origin` -- used by the mass-property integrators for
/// convex hulls and capsules alike (see `calculateTensor` in the source).
pub fn tetrahedron_volume(a: Point, b: Point, c: Point, d: Point) -> Real {
    (b - a).cross(&(c - a)).dot(&(d - a)) / 6.0
}

/// Clamp helper that also tolerates `min > max` by returning `min`,
/// matching the defensive behaviour of the C++ `mathCLAMP` macro this
/// engine was ported from.
#[inline]
pub fn clamp(x: Real, min: Real, max: Real) -> Real {
    if min > max {
        min
    } else if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}
