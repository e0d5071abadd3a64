//! Hinge-axis alignment (§4.9): keeps a hinge axis fixed in body1's
//! frame parallel to the corresponding axis fixed in body2's frame,
//! removing the two rotational degrees of freedom a hinge does not
//! allow (only spin about the shared axis remains free).
//!
//! The misalignment `axis1 x axis2` is a small-angle error vector
//! perpendicular to both axes; its components along two axes
//! perpendicular to the (world) hinge direction become the bias for two
//! [`AngularRotation`] constraints.

use super::angular_rotation::AngularRotation;
use crate::dynamics::rigid_body::RigidBody;
use crate::math::{Real, Vector};
use crate::utils::SdpMatrix3;

pub struct HingeAxis {
    perp: [AngularRotation; 2],
}

impl HingeAxis {
    pub fn new(world_axis1: Vector, world_axis2: Vector, inv_i1: SdpMatrix3, inv_i2: SdpMatrix3, baumgarte: Real) -> Self {
        let (u, v) = crate::utils::perpendicular_basis(&world_axis1);
        let misalignment = world_axis1.cross(&world_axis2);
        let perp = [
            AngularRotation::new(u, inv_i1, inv_i2, baumgarte * misalignment.dot(&u)),
            AngularRotation::new(v, inv_i1, inv_i2, baumgarte * misalignment.dot(&v)),
        ];
        Self { perp }
    }

    pub fn warm_start(&self, mut body1: Option<&mut RigidBody>, mut body2: Option<&mut RigidBody>) {
        self.perp[0].warm_start(body1.as_deref_mut(), body2.as_deref_mut());
        self.perp[1].warm_start(body1.as_deref_mut(), body2.as_deref_mut());
    }

    pub fn solve_velocity(&mut self, mut body1: Option<&mut RigidBody>, mut body2: Option<&mut RigidBody>) {
        self.perp[0].solve_velocity(body1.as_deref_mut(), body2.as_deref_mut(), -Real::MAX, Real::MAX);
        self.perp[1].solve_velocity(body1.as_deref_mut(), body2.as_deref_mut(), -Real::MAX, Real::MAX);
    }
}
