//! Pure angular constraint (§4.9): drives relative angular velocity
//! about a fixed world axis to zero (or to a bias), independent of
//! either body's lever arm. Used for a hinge's twist-lock and the
//! angle-limit stop, which constrain orientation about the hinge axis
//! itself rather than a point in space.

use crate::dynamics::rigid_body::RigidBody;
use crate::math::{Real, Vector};
use crate::utils::SdpMatrix3;

pub struct AngularRotation {
    pub axis: Vector,
    effective_mass: Real,
    bias: Real,
    pub total_lambda: Real,
    active: bool,
}

impl AngularRotation {
    pub fn new(axis: Vector, inv_i1: SdpMatrix3, inv_i2: SdpMatrix3, bias: Real) -> Self {
        let k = axis.dot(&inv_i1.mul_vector(axis)) + axis.dot(&inv_i2.mul_vector(axis));
        Self {
            axis,
            effective_mass: crate::utils::inv(k),
            bias,
            total_lambda: 0.0,
            active: true,
        }
    }

    /// An inactive constraint (e.g. a hinge limit not currently engaged)
    /// contributes nothing and forgets its accumulated impulse, so it
    /// doesn't warm-start a solve it took no part in.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.total_lambda = 0.0;
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn warm_start(&self, body1: Option<&mut RigidBody>, body2: Option<&mut RigidBody>) {
        if !self.active {
            return;
        }
        apply_angular_impulse(body1, -self.axis * self.total_lambda);
        apply_angular_impulse(body2, self.axis * self.total_lambda);
    }

    pub fn solve_velocity(&mut self, body1: Option<&mut RigidBody>, body2: Option<&mut RigidBody>, min: Real, max: Real) {
        if !self.active {
            return;
        }
        let w1 = body1.as_deref().map(|b| b.angular_velocity).unwrap_or_default();
        let w2 = body2.as_deref().map(|b| b.angular_velocity).unwrap_or_default();
        let jv = self.axis.dot(&w2) - self.axis.dot(&w1);
        let unclamped = -(jv + self.bias) * self.effective_mass;

        let old_total = self.total_lambda;
        self.total_lambda = crate::utils::clamp(old_total + unclamped, min, max);
        let delta = self.total_lambda - old_total;

        apply_angular_impulse(body1, -self.axis * delta);
        apply_angular_impulse(body2, self.axis * delta);
    }
}

fn apply_angular_impulse(body: Option<&mut RigidBody>, angular_impulse: Vector) {
    if let Some(b) = body {
        b.angular_velocity += b.inv_inertia_world.mul_vector(angular_impulse);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::rigid_body::MassProperties;
    use crate::geometry::ColliderHandle;
    use crate::math::Isometry;

    fn body() -> RigidBody {
        RigidBody::new(Isometry::identity(), MassProperties::new(1.0, SdpMatrix3::identity()), ColliderHandle::default())
    }

    #[test]
    fn relative_spin_is_cancelled() {
        let mut a = body();
        let mut b = body();
        a.angular_velocity = Vector::new(0.0, 2.0, 0.0);
        b.angular_velocity = Vector::new(0.0, -2.0, 0.0);

        let inv_i1 = a.inv_inertia_world;
        let inv_i2 = b.inv_inertia_world;
        let mut constraint = AngularRotation::new(Vector::y(), inv_i1, inv_i2, 0.0);
        for _ in 0..8 {
            constraint.solve_velocity(Some(&mut a), Some(&mut b), -1.0e6, 1.0e6);
        }
        assert!((b.angular_velocity.y - a.angular_velocity.y).abs() < 1.0e-3);
    }

    #[test]
    fn inactive_constraint_forgets_its_impulse() {
        let inv_i1 = SdpMatrix3::identity();
        let inv_i2 = SdpMatrix3::identity();
        let mut constraint = AngularRotation::new(Vector::y(), inv_i1, inv_i2, 0.0);
        constraint.total_lambda = 5.0;
        constraint.deactivate();
        assert_eq!(constraint.total_lambda, 0.0);
        assert!(!constraint.is_active());
    }
}
