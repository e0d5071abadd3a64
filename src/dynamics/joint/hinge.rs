//! Hinge joint (§4.9, §6 `add_hinge_joint`): one free rotational degree
//! of freedom about a shared axis, everything else locked. Built fresh
//! every step from the two bodies' current transforms, the same way a
//! [`crate::dynamics::solver::contact_constraint::ContactConstraint`] is
//! rebuilt from a manifold rather than persisted and incrementally
//! updated.

use crate::dynamics::rigid_body::RigidBody;
use crate::dynamics::solver::anchor_point::AnchorPoint;
use crate::dynamics::solver::angular_rotation::AngularRotation;
use crate::dynamics::solver::axis_constraint::Endpoint;
use crate::dynamics::solver::hinge_axis::HingeAxis;
use crate::math::{Point, Real, Vector};

/// A hinge's static description: anchor and axis, each expressed in the
/// local frame of the body it belongs to, plus an optional angle limit
/// (§4.9 "Hinge: anchor + hinge-axis + optional angle-limit").
pub struct Hinge {
    pub local_anchor1: Point,
    pub local_anchor2: Point,
    pub local_axis1: Vector,
    pub local_axis2: Vector,
    /// A reference direction perpendicular to the axis, fixed in each
    /// body's local frame, used only to measure the current relative
    /// angle for the limit (not a constrained quantity itself).
    local_reference1: Vector,
    local_reference2: Vector,
    pub limit: Option<(Real, Real)>,
}

impl Hinge {
    pub fn new(local_anchor1: Point, local_anchor2: Point, local_axis1: Vector, local_axis2: Vector) -> Self {
        let (reference1, _) = crate::utils::perpendicular_basis(&local_axis1);
        let (reference2, _) = crate::utils::perpendicular_basis(&local_axis2);
        Self {
            local_anchor1,
            local_anchor2,
            local_axis1,
            local_axis2,
            local_reference1: reference1,
            local_reference2: reference2,
            limit: None,
        }
    }

    pub fn with_limit(mut self, min_angle: Real, max_angle: Real) -> Self {
        self.limit = Some((min_angle, max_angle));
        self
    }

    /// The world hinge axis and the relative rotation of body2 about it,
    /// in `(-pi, pi]`, measured from each body's reference direction.
    pub(crate) fn current_axis_and_angle(&self, body1: &RigidBody, body2: &RigidBody) -> (Vector, Real) {
        let axis = body1.transform.rotation * self.local_axis1;
        let p1 = body1.transform.rotation * self.local_reference1;
        let p2 = body2.transform.rotation * self.local_reference2;
        let angle = axis.dot(&p1.cross(&p2)).atan2(p1.dot(&p2));
        (axis, angle)
    }

    pub fn prepare(&self, body1: &RigidBody, body2: &RigidBody, baumgarte: Real) -> HingeConstraint {
        let anchor1_world = body1.transform * self.local_anchor1;
        let anchor2_world = body2.transform * self.local_anchor2;
        let r1 = anchor1_world - Point::from(body1.transform.translation.vector);
        let r2 = anchor2_world - Point::from(body2.transform.translation.vector);
        let anchor_error = anchor2_world - anchor1_world;

        let (axis, angle) = self.current_axis_and_angle(body1, body2);
        let world_axis2 = body2.transform.rotation * self.local_axis2;

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

        let limit = self.limit.map(|(min, max)| {
            let over_max = angle > max;
            let over_min = angle < min;
            let bias = if over_max {
                baumgarte * (angle - max)
            } else if over_min {
                baumgarte * (angle - min)
            } else {
                0.0
            };
            let mut constraint = AngularRotation::new(axis, body1.inv_inertia_world, body2.inv_inertia_world, bias);
            if !over_max && !over_min {
                constraint.deactivate();
            }
            constraint
        });

        HingeConstraint { anchor, axis_lock, limit }
    }
}

/// The solver building blocks a [`Hinge`] assembles into, re-derived
/// every step.
pub struct HingeConstraint {
    anchor: AnchorPoint,
    axis_lock: HingeAxis,
    limit: Option<AngularRotation>,
}

impl HingeConstraint {
    pub fn warm_start(&self, body1: &mut Endpoint, body2: &mut Endpoint) {
        self.anchor.warm_start(body1, body2);
    }

    pub fn solve_velocity(&mut self, body1: &mut Endpoint, body2: &mut Endpoint) {
        self.anchor.solve_velocity(body1, body2);
        self.axis_lock.solve_velocity(body1.as_rigid_body_mut(), body2.as_rigid_body_mut());
        if let Some(limit) = &mut self.limit {
            limit.solve_velocity(body1.as_rigid_body_mut(), body2.as_rigid_body_mut(), Real::MIN, Real::MAX);
        }
    }

    pub fn solve_position(&self, body1: &mut Endpoint, body2: &mut Endpoint, baumgarte: Real, error: Vector) {
        self.anchor.solve_position(body1, body2, baumgarte, error);
    }
}
