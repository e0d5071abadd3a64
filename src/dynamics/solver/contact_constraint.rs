//! Per-manifold contact constraint (§4.9): one normal axis (non-negative
//! impulse, Baumgarte + restitution bias) plus two friction tangents
//! (impulse box-clamped to the *previous* iteration's normal impulse,
//! Coulomb's law applied one axis at a time rather than as a true
//! circular cone) per contact point, solved friction-then-normal each
//! velocity iteration as the source does, then a separate position pass.

use super::axis_constraint::{AxisConstraint, Endpoint};
use crate::dynamics::rigid_body::RigidBody;
use crate::geometry::contact::{ContactId, ContactManifold};
use crate::math::{Point, Real, Vector};
use rustc_hash::FxHashMap;

pub struct ContactSolverSettings {
    pub baumgarte_factor: Real,
    pub linear_slop: Real,
    pub min_velocity_for_restitution: Real,
}

impl Default for ContactSolverSettings {
    fn default() -> Self {
        Self {
            baumgarte_factor: 0.3,
            linear_slop: 0.01,
            min_velocity_for_restitution: 1.5,
        }
    }
}

/// Read-only snapshot of whatever an endpoint's effective mass and
/// current velocity at a point require -- a body, or a fixed anchor
/// with infinite mass.
enum BodyView<'a> {
    Body(&'a RigidBody),
    Fixed,
}

impl BodyView<'_> {
    fn inv_mass(&self) -> Real {
        match self {
            BodyView::Body(b) => b.mass_properties.inv_mass,
            BodyView::Fixed => 0.0,
        }
    }

    fn inv_inertia(&self) -> crate::utils::SdpMatrix3 {
        match self {
            BodyView::Body(b) => b.inv_inertia_world,
            BodyView::Fixed => crate::utils::SdpMatrix3::zero(),
        }
    }

    fn arm_to(&self, point: Point) -> Vector {
        match self {
            BodyView::Body(b) => point - Point::from(b.transform.translation.vector),
            BodyView::Fixed => Vector::zeros(),
        }
    }

    fn velocity_at(&self, r: Vector) -> Vector {
        match self {
            BodyView::Body(b) => b.linear_velocity + b.angular_velocity.cross(&r),
            BodyView::Fixed => Vector::zeros(),
        }
    }
}

struct ContactPointConstraint {
    id: ContactId,
    normal: AxisConstraint,
    tangent1: AxisConstraint,
    tangent2: AxisConstraint,
    penetration: Real,
}

pub struct ContactConstraint {
    points: Vec<ContactPointConstraint>,
    friction: Real,
}

impl ContactConstraint {
    /// `warm_start_cache` holds this pair's impulses from the previous step
    /// (§4.9 "warm-start by applying each cached impulse ... the
    /// implementation uses 1 -- full reapply"), keyed by the contact ID the
    /// narrow phase assigned -- which must stay stable across steps so
    /// the cache lookup actually lands on the same physical contact
    /// (§3 "Impulse cache symmetry").
    pub fn new(
        manifold: &ContactManifold,
        body1: Option<&RigidBody>,
        body2: Option<&RigidBody>,
        settings: &ContactSolverSettings,
        warm_start_cache: &FxHashMap<ContactId, (Real, Real, Real)>,
    ) -> Self {
        let view1 = body1.map_or(BodyView::Fixed, BodyView::Body);
        let view2 = body2.map_or(BodyView::Fixed, BodyView::Body);

        let friction = manifold.material1.combined_friction(&manifold.material2);
        let restitution = manifold.material1.combined_restitution(&manifold.material2);
        let normal = manifold.average_normal();
        let (t1, t2) = crate::utils::perpendicular_basis(&normal);

        let points = manifold
            .points
            .iter()
            .map(|p| {
                let r1 = view1.arm_to(p.position1);
                let r2 = view2.arm_to(p.position2);

                let closing_speed = normal.dot(&(view1.velocity_at(r1) - view2.velocity_at(r2)));
                let restitution_bias = if closing_speed > settings.min_velocity_for_restitution {
                    -restitution * closing_speed
                } else {
                    0.0
                };
                let position_bias = settings.baumgarte_factor * (p.penetration + settings.linear_slop).min(0.0);
                let bias = restitution_bias + position_bias;

                let cached = warm_start_cache.get(&p.id).copied().unwrap_or((0.0, 0.0, 0.0));
                let mut normal_axis = AxisConstraint::new(normal, r1, r2, view1.inv_mass(), view1.inv_inertia(), view2.inv_mass(), view2.inv_inertia(), bias);
                let mut tangent1_axis = AxisConstraint::new(t1, r1, r2, view1.inv_mass(), view1.inv_inertia(), view2.inv_mass(), view2.inv_inertia(), 0.0);
                let mut tangent2_axis = AxisConstraint::new(t2, r1, r2, view1.inv_mass(), view1.inv_inertia(), view2.inv_mass(), view2.inv_inertia(), 0.0);
                normal_axis.total_lambda = cached.0;
                tangent1_axis.total_lambda = cached.1;
                tangent2_axis.total_lambda = cached.2;

                ContactPointConstraint {
                    id: p.id,
                    normal: normal_axis,
                    tangent1: tangent1_axis,
                    tangent2: tangent2_axis,
                    penetration: p.penetration,
                }
            })
            .collect();

        Self { points, friction }
    }

    /// Accumulated impulses per contact ID, for the cache manager to
    /// retain and replay as next step's `warm_start_cache` (§4.10).
    pub fn impulses(&self) -> impl Iterator<Item = (ContactId, (Real, Real, Real))> + '_ {
        self.points
            .iter()
            .map(|p| (p.id, (p.normal.total_lambda, p.tangent1.total_lambda, p.tangent2.total_lambda)))
    }

    pub fn warm_start(&self, body1: &mut Endpoint, body2: &mut Endpoint) {
        for p in &self.points {
            p.normal.warm_start(body1, body2);
            p.tangent1.warm_start(body1, body2);
            p.tangent2.warm_start(body1, body2);
        }
    }

    /// Friction before the normal impulse each iteration, clamped to the
    /// normal impulse accumulated so far (the source's ordering -- using
    /// the *previous* iteration's normal lambda as the friction bound is
    /// what keeps this a sequence of small LCPs instead of one joint
    /// solve).
    pub fn solve_velocity(&mut self, body1: &mut Endpoint, body2: &mut Endpoint) {
        for p in &mut self.points {
            let bound = self.friction * p.normal.total_lambda;
            p.tangent1.solve_velocity(body1, body2, -bound, bound);
            p.tangent2.solve_velocity(body1, body2, -bound, bound);
            p.normal.solve_velocity(body1, body2, 0.0, Real::MAX);
        }
    }

    pub fn solve_position(&self, body1: &mut Endpoint, body2: &mut Endpoint, baumgarte: Real, linear_slop: Real) {
        for p in &self.points {
            let error = p.penetration + linear_slop;
            if error >= 0.0 {
                continue;
            }
            p.normal.solve_position(body1, body2, baumgarte, error);
        }
    }
}
