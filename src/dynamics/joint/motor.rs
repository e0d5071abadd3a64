//! Motor joint (§4.9 "Motor: same as hinge but velocity-target +
//! torque-bounds"): the same anchor and axis-alignment locks as a
//! [`super::hinge::Hinge`], but drives the spin velocity about the
//! hinge axis toward a target instead of leaving it free, with the
//! driving impulse clamped to what `max_torque * dt` can supply.

use crate::dynamics::joint::hinge::Hinge;
use crate::dynamics::rigid_body::RigidBody;
use crate::dynamics::solver::anchor_point::AnchorPoint;
use crate::dynamics::solver::angular_rotation::AngularRotation;
use crate::dynamics::solver::axis_constraint::Endpoint;
use crate::dynamics::solver::hinge_axis::HingeAxis;
use crate::math::{Point, Real, Vector};

pub struct Motor {
    pub hinge: Hinge,
    pub target_velocity: Real,
    pub max_torque: Real,
}

impl Motor {
    pub fn new(hinge: Hinge, target_velocity: Real, max_torque: Real) -> Self {
        Self { hinge, target_velocity, max_torque }
    }

    pub fn prepare(&self, body1: &RigidBody, body2: &RigidBody, baumgarte: Real, dt: Real) -> MotorConstraint {
        let anchor1_world = body1.transform * self.hinge.local_anchor1;
        let anchor2_world = body2.transform * self.hinge.local_anchor2;
        let r1 = anchor1_world - Point::from(body1.transform.translation.vector);
        let r2 = anchor2_world - Point::from(body2.transform.translation.vector);
        let anchor_error = anchor2_world - anchor1_world;

        let (axis, _) = self.hinge.current_axis_and_angle(body1, body2);
        let world_axis2 = body2.transform.rotation * self.hinge.local_axis2;

        let anchor = AnchorPoint::new(
            r1,
            r2,
            body1.mass_properties.inv_mass,
            body1.inv_inertia_world,
            body2.mass_properties.inv_mass,
            body2.inv_inertia_world,
            anchor_error * baumgarte,
        );
        let axis_lock = HingeAxis::new(axis, world_axis2, body1.inv_inertia_world, body2.inv_inertia_world, baumgarte);
        let drive = AngularRotation::new(axis, body1.inv_inertia_world, body2.inv_inertia_world, -self.target_velocity);
        let bound = (self.max_torque * dt).abs();

        MotorConstraint { anchor, axis_lock, drive, bound }
    }
}

pub struct MotorConstraint {
    anchor: AnchorPoint,
    axis_lock: HingeAxis,
    drive: AngularRotation,
    bound: Real,
}

impl MotorConstraint {
    pub fn warm_start(&self, body1: &mut Endpoint, body2: &mut Endpoint) {
        self.anchor.warm_start(body1, body2);
        self.drive.warm_start(body1.as_rigid_body_mut(), body2.as_rigid_body_mut());
    }

    pub fn solve_velocity(&mut self, body1: &mut Endpoint, body2: &mut Endpoint) {
        self.anchor.solve_velocity(body1, body2);
        self.axis_lock.solve_velocity(body1.as_rigid_body_mut(), body2.as_rigid_body_mut());
        self.drive.solve_velocity(body1.as_rigid_body_mut(), body2.as_rigid_body_mut(), -self.bound, self.bound);
    }

    pub fn solve_position(&self, body1: &mut Endpoint, body2: &mut Endpoint, baumgarte: Real, error: Vector) {
        self.anchor.solve_position(body1, body2, baumgarte, error);
    }
}
