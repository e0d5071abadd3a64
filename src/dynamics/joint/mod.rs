//! Joint types (§4.9, §6): composed from the same
//! [`crate::dynamics::solver`] axis constraints the contact solver uses.

pub mod cone;
pub mod hinge;
pub mod joint_set;
pub mod motor;

pub use cone::{Cone, ConeConstraint};
pub use hinge::{Hinge, HingeConstraint};
pub use joint_set::{Joint, JointHandle, JointKind, JointSet};
pub use motor::{Motor, MotorConstraint};
