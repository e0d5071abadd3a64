//! Sequential-impulse constraint solver building blocks (§4.9): a single
//! [`axis_constraint::AxisConstraint`] is the atom every composite
//! constraint -- contacts, anchors, hinge/cone locks -- assembles from.

pub mod anchor_point;
pub mod angular_rotation;
pub mod axis_constraint;
pub mod contact_constraint;
pub mod hinge_axis;

pub use anchor_point::AnchorPoint;
pub use angular_rotation::AngularRotation;
pub use axis_constraint::{AxisConstraint, Endpoint};
pub use contact_constraint::{ContactConstraint, ContactSolverSettings};
pub use hinge_axis::HingeAxis;
