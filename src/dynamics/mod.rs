//! Rigid bodies, islands, and the sequential-impulse constraint solver
//! that integrates them (§3, §4.8, §4.9).

pub mod island;
pub mod joint;
pub mod rigid_body;
pub mod rigid_body_set;
pub mod solver;

pub use island::IslandBuilder;
pub use joint::{Cone, Hinge, Joint, JointHandle, JointKind, JointSet, Motor};
pub use rigid_body::{MassProperties, RigidBody, RigidBodyHandle, RigidBodySettings};
pub use rigid_body_set::RigidBodySet;
