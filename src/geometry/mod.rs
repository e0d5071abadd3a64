//! Collision geometry: primitive shapes and the algorithms built on top of
//! their support/closest-point interface -- GJK, SAT, the octree broad
//! phase, time-of-impact, and per-pair narrow-phase contact generation.

mod aabb;
mod ball;
mod capsule;
mod collider;
mod contact;
mod convex_hull;
mod gjk;
mod heightfield;
pub mod narrow_phase;
mod octree;
mod sat;
mod shape;
mod toi;
mod triangle;
mod trimesh;

pub use aabb::{Aabb, AabbRelation};
pub use ball::Ball;
pub use capsule::Capsule;
pub use collider::{
    Collider, ColliderBuilder, ColliderHandle, ColliderMotionState, ColliderSet, PhysicsMaterial,
};
pub use contact::{pair_key, ContactId, ContactManifold, ContactPoint};
pub use convex_hull::{ConvexHull, Face, HalfEdge, HalfEdgeMesh};
pub use gjk::{gjk_distance, gjk_overlap, GjkStatus};
pub use heightfield::{BumpyTerrainParameters, FlatTerrainParameters, HeightField};
pub use narrow_phase::NarrowPhase;
pub use octree::{EntityId, Octree, OctreeNodeView};
pub use sat::sat_overlap;
pub use shape::{ConvexShape, Shape, ShapeKind};
pub use toi::{time_of_impact, ToiStatus};
pub use triangle::Triangle;
pub use trimesh::TriangleMesh;
