//! The single-axis Jacobian constraint every higher-level constraint
//! composes from (§4.9): contacts use three per point (normal + two
//! friction tangents), point-to-point anchors use three world axes,
//! hinges and cones add one or two more for their angular limits.
//!
//! For axis `n` with lever arms `r1`/`r2` from each body's center of
//! mass to the constrained point:
//!
//! ```text
//! Jv   = n . (v2 + w2 x r2) - n . (v1 + w1 x r1)
//! lambda = -(Jv + bias) / (J M^-1 J^t)
//! clamp total_lambda to [min, max], apply V += M^-1 J^t lambda
//! ```

use crate::dynamics::rigid_body::RigidBody;
use crate::math::{Real, Vector};
use crate::utils::SdpMatrix3;

/// One side of a constraint: either a simulated body or a fixed world
/// anchor, which contributes infinite mass and never moves (§3: a
/// world-anchored hinge has no body on one side). Lever arms live on the
/// [`AxisConstraint`] itself, not here, since several axis constraints
/// with different arms (one per contact point) commonly share the same
/// pair of endpoints.
pub enum Endpoint<'a> {
    Body(&'a mut RigidBody),
    Fixed,
}

impl<'a> Endpoint<'a> {
    fn velocity_at(&self, r: Vector) -> Vector {
        match self {
            Endpoint::Body(b) => b.linear_velocity + b.angular_velocity.cross(&r),
            Endpoint::Fixed => Vector::zeros(),
        }
    }

    fn inv_mass(&self) -> Real {
        match self {
            Endpoint::Body(b) => b.mass_properties.inv_mass,
            Endpoint::Fixed => 0.0,
        }
    }

    fn inv_inertia(&self) -> SdpMatrix3 {
        match self {
            Endpoint::Body(b) => b.inv_inertia_world,
            Endpoint::Fixed => SdpMatrix3::zero(),
        }
    }

    fn apply_impulse(&mut self, linear_impulse: Vector, r: Vector) {
        if let Endpoint::Body(b) = self {
            b.linear_velocity += linear_impulse * b.mass_properties.inv_mass;
            b.angular_velocity += b.inv_inertia_world.mul_vector(r.cross(&linear_impulse));
        }
    }

    /// Exposes the underlying body, for constraints (hinge/cone angular
    /// locks) built directly on [`RigidBody`] rather than on
    /// [`AxisConstraint`].
    pub fn as_rigid_body_mut(&mut self) -> Option<&mut RigidBody> {
        match self {
            Endpoint::Body(b) => Some(&mut **b),
            Endpoint::Fixed => None,
        }
    }
}

pub struct AxisConstraint {
    pub axis: Vector,
    r1: Vector,
    r2: Vector,
    effective_mass: Real,
    bias: Real,
    pub total_lambda: Real,
}

impl AxisConstraint {
    /// `r1`/`r2` are the lever arms from each body's center of mass to the
    /// constrained point, in world space. `bias` folds in both
    /// restitution (a target closing velocity) and Baumgarte position
    /// feedback the caller already combined into one number, matching
    /// the source's contact constraints.
    ///
    /// Takes mass properties directly rather than an [`Endpoint`]: the
    /// effective mass only needs to *read* them, and several axis
    /// constraints sharing one pair of bodies (every point of a
    /// multi-point contact manifold) would otherwise need several
    /// simultaneous mutable borrows of the same bodies just to be built.
    pub fn new(axis: Vector, r1: Vector, r2: Vector, inv_mass1: Real, inv_i1: SdpMatrix3, inv_mass2: Real, inv_i2: SdpMatrix3, bias: Real) -> Self {
        let ra = r1.cross(&axis);
        let rb = r2.cross(&axis);
        let k = inv_mass1 + inv_mass2 + ra.dot(&inv_i1.mul_vector(ra)) + rb.dot(&inv_i2.mul_vector(rb));
        Self {
            axis,
            r1,
            r2,
            effective_mass: crate::utils::inv(k),
            bias,
            total_lambda: 0.0,
        }
    }

    /// Re-applies the impulse accumulated in a previous step (§4.10
    /// warm-starting), before the first velocity iteration of this one.
    pub fn warm_start(&self, body1: &mut Endpoint, body2: &mut Endpoint) {
        let impulse = self.axis * self.total_lambda;
        body1.apply_impulse(-impulse, self.r1);
        body2.apply_impulse(impulse, self.r2);
    }

    pub fn solve_velocity(&mut self, body1: &mut Endpoint, body2: &mut Endpoint, min: Real, max: Real) -> Real {
        let rel_vel = body2.velocity_at(self.r2) - body1.velocity_at(self.r1);
        let jv = self.axis.dot(&rel_vel);
        let unclamped = -(jv + self.bias) * self.effective_mass;

        let old_total = self.total_lambda;
        self.total_lambda = crate::utils::clamp(old_total + unclamped, min, max);
        let delta = self.total_lambda - old_total;

        let impulse = self.axis * delta;
        body1.apply_impulse(-impulse, self.r1);
        body2.apply_impulse(impulse, self.r2);
        delta
    }

    /// Direct position correction (§4.9, §4.8): unlike [`Self::solve_velocity`]
    /// this nudges transforms, not velocities, and is not accumulated into
    /// `total_lambda` -- `error` is recomputed from current positions
    /// before every call. Callers decide when correction is warranted at
    /// all (a contact only corrects while actually penetrating; an
    /// anchor or hinge corrects in either direction).
    pub fn solve_position(&self, body1: &mut Endpoint, body2: &mut Endpoint, baumgarte: Real, error: Real) {
        let ra = self.r1.cross(&self.axis);
        let rb = self.r2.cross(&self.axis);
        let k = body1.inv_mass()
            + body2.inv_mass()
            + ra.dot(&body1.inv_inertia().mul_vector(ra))
            + rb.dot(&body2.inv_inertia().mul_vector(rb));
        let lambda = crate::utils::inv(k) * (-error * baumgarte);
        let correction = self.axis * lambda;

        if let Endpoint::Body(b) = body1 {
            b.transform.translation.vector -= correction * b.mass_properties.inv_mass;
            let delta_rot = b.inv_inertia_world.mul_vector(self.r1.cross(&correction)) * -1.0;
            b.transform.rotation = crate::utils::rotation_quaternion(delta_rot) * b.transform.rotation;
            b.transform.rotation = b.transform.rotation.normalize();
        }
        if let Endpoint::Body(b) = body2 {
            b.transform.translation.vector += correction * b.mass_properties.inv_mass;
            let delta_rot = b.inv_inertia_world.mul_vector(self.r2.cross(&correction));
            b.transform.rotation = crate::utils::rotation_quaternion(delta_rot) * b.transform.rotation;
            b.transform.rotation = b.transform.rotation.normalize();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::rigid_body::MassProperties;
    use crate::geometry::ColliderHandle;
    use crate::math::Isometry;

    fn free_body() -> RigidBody {
        RigidBody::new(Isometry::identity(), MassProperties::new(1.0, SdpMatrix3::identity()), ColliderHandle::default())
    }

    #[test]
    fn opposed_velocities_are_cancelled_by_solving() {
        let mut a = free_body();
        let mut b = free_body();
        a.linear_velocity = Vector::new(1.0, 0.0, 0.0);
        b.linear_velocity = Vector::new(-1.0, 0.0, 0.0);

        let (inv_mass, inv_i) = (a.mass_properties.inv_mass, a.inv_inertia_world);
        let mut constraint = AxisConstraint::new(Vector::x(), Vector::zeros(), Vector::zeros(), inv_mass, inv_i, inv_mass, inv_i, 0.0);
        let mut ea = Endpoint::Body(&mut a);
        let mut eb = Endpoint::Body(&mut b);
        for _ in 0..8 {
            constraint.solve_velocity(&mut ea, &mut eb, -1.0e6, 1.0e6);
        }

        let rel = b.linear_velocity.x - a.linear_velocity.x;
        assert!(rel.abs() < 1.0e-3, "relative velocity along axis should converge to 0, got {rel}");
    }

    #[test]
    fn fixed_endpoint_absorbs_all_impulse() {
        let mut a = free_body();
        a.linear_velocity = Vector::new(2.0, 0.0, 0.0);

        let (inv_mass, inv_i) = (a.mass_properties.inv_mass, a.inv_inertia_world);
        let mut constraint = AxisConstraint::new(Vector::x(), Vector::zeros(), Vector::zeros(), inv_mass, inv_i, 0.0, SdpMatrix3::zero(), 0.0);
        let mut ea = Endpoint::Body(&mut a);
        let mut fixed = Endpoint::Fixed;
        for _ in 0..8 {
            constraint.solve_velocity(&mut ea, &mut fixed, -1.0e6, 1.0e6);
        }
        assert!(a.linear_velocity.x.abs() < 1.0e-3);
    }
}
