//! Cone joint (§4.9 "Cone: anchor + angle"): a point-to-point anchor
//! plus a swing limit -- body2's reference axis may wander freely
//! inside a cone of half-angle `max_angle` around body1's, but no
//! further. Unlike [`super::hinge::Hinge`] there is no free spin axis to
//! preserve: only the anchor and the cone limit are constrained.

use crate::dynamics::rigid_body::RigidBody;
use crate::dynamics::solver::anchor_point::AnchorPoint;
use crate::dynamics::solver::angular_rotation::AngularRotation;
use crate::dynamics::solver::axis_constraint::Endpoint;
use crate::math::{Point, Real, Vector};

pub struct Cone {
    pub local_anchor1: Point,
    pub local_anchor2: Point,
    pub local_axis1: Vector,
    pub local_axis2: Vector,
    pub max_angle: Real,
}

impl Cone {
    pub fn new(local_anchor1: Point, local_anchor2: Point, local_axis1: Vector, local_axis2: Vector, max_angle: Real) -> Self {
        Self { local_anchor1, local_anchor2, local_axis1, local_axis2, max_angle }
    }

    pub fn prepare(&self, body1: &RigidBody, body2: &RigidBody, baumgarte: Real) -> ConeConstraint {
        let anchor1_world = body1.transform * self.local_anchor1;
        let anchor2_world = body2.transform * self.local_anchor2;
        let r1 = anchor1_world - Point::from(body1.transform.translation.vector);
        let r2 = anchor2_world - Point::from(body2.transform.translation.vector);
        let anchor_error = anchor2_world - anchor1_world;

        let anchor = AnchorPoint::new(
            r1,
            r2,
            body1.mass_properties.inv_mass,
            body1.inv_inertia_world,
            body2.mass_properties.inv_mass,
            body2.inv_inertia_world,
            anchor_error * baumgarte,
        );

        let axis1 = body1.transform.rotation * self.local_axis1;
        let axis2 = body2.transform.rotation * self.local_axis2;
        let cos_angle = axis1.dot(&axis2).clamp(-1.0, 1.0);
        let angle = cos_angle.acos();

        let swing = axis1.cross(&axis2);
        let limit = if angle > self.max_angle {
            let swing_axis = swing.try_normalize(crate::math::DEFAULT_EPSILON).unwrap_or(Vector::y());
            let mut constraint = AngularRotation::new(swing_axis, body1.inv_inertia_world, body2.inv_inertia_world, baumgarte * (angle - self.max_angle));
            constraint.activate();
            Some(constraint)
        } else {
            None
        };

        ConeConstraint { anchor, limit }
    }
}

pub struct ConeConstraint {
    anchor: AnchorPoint,
    limit: Option<AngularRotation>,
}

impl ConeConstraint {
    pub fn warm_start(&self, body1: &mut Endpoint, body2: &mut Endpoint) {
        self.anchor.warm_start(body1, body2);
    }

    pub fn solve_velocity(&mut self, body1: &mut Endpoint, body2: &mut Endpoint) {
        self.anchor.solve_velocity(body1, body2);
        if let Some(limit) = &mut self.limit {
            limit.solve_velocity(body1.as_rigid_body_mut(), body2.as_rigid_body_mut(), 0.0, Real::MAX);
        }
    }

    pub fn solve_position(&self, body1: &mut Endpoint, body2: &mut Endpoint, baumgarte: Real, error: Vector) {
        self.anchor.solve_position(body1, body2, baumgarte, error);
    }
}
