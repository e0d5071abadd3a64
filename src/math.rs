//! Scalar and linear-algebra type aliases shared by every subsystem.
//!
//! Mirrors the way the rest of the core is built: a single-precision
//! scalar type plus a handful of `nalgebra` aliases so the rest of the
//! crate never has to spell out `nalgebra::Vector3<f32>` directly.

/// The scalar type used throughout the engine.
pub type Real = f32;

/// A 3D vector (velocity, force, displacement, ...).
pub type Vector = nalgebra::Vector3<Real>;
/// A 3D point (position, vertex, contact location, ...).
pub type Point = nalgebra::Point3<Real>;
/// An angular (axis-angle) vector: `angularVelocity`, `deltaOrientation`, torque, ...
pub type AngVector = nalgebra::Vector3<Real>;
/// A unit quaternion orientation.
pub type Rotation = nalgebra::UnitQuaternion<Real>;
/// A rigid transform: translation plus rotation.
pub type Isometry = nalgebra::Isometry3<Real>;
/// A dense 3x3 matrix, used for inertia tensors before symmetrisation.
pub type Matrix3 = nalgebra::Matrix3<Real>;
/// A non-unit direction/displacement in 3-space; alias kept distinct from
/// [`Vector`] only for readability at call sites.
pub type Translation = nalgebra::Translation3<Real>;

/// Default gravitational acceleration, `-9.81` along `y`, matching the
/// convention used by every worked example in this crate's tests.
pub fn default_gravity() -> Vector {
    Vector::new(0.0, -9.81, 0.0)
}

/// Smallest `Real` distinguishable from zero for this engine's tolerances.
/// Not `Real::EPSILON`: that value is too tight for the iterative solvers
/// and GJK/SAT termination criteria, which operate on accumulated error.
pub const DEFAULT_EPSILON: Real = 1.0e-5;
