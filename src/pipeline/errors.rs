//! World-level error type (§7): almost everything in this engine fails
//! silently by contract -- a missing cache entry regenerates, a stale
//! handle returns `None`, a degenerate inertia tensor inverts to zero
//! rather than panicking. The handful of cases that *are* a caller
//! mistake (not a numerical one) surface here instead of asserting, so
//! an embedder gets a `Result` rather than a panic across an FFI/plugin
//! boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("collider handle does not refer to a collider in this world")]
    UnknownCollider,
    #[error("rigid body handle does not refer to a body in this world")]
    UnknownRigidBody,
    #[error("dynamic triangle meshes are not supported; use ColliderMotionState::Motionless")]
    DynamicTriangleMesh,
    #[error("a height field has already been initialised for this world")]
    HeightFieldAlreadyInitialised,
}
