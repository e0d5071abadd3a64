//! One simulated rigid body (§3, §4.8): transform, velocities, mass
//! properties and the sleep bookkeeping the integrator drives.

use crate::geometry::ColliderHandle;
use crate::math::{AngVector, Isometry, Real, Translation, Vector};
use crate::utils::SdpMatrix3;

slotmap::new_key_type! {
    /// Stable identifier for a rigid body; shared across all of that
    /// body's colliders (a compound's components all point at the same
    /// handle, §3).
    pub struct RigidBodyHandle;
}

/// Mass and inertia, computed once at construction from the owning
/// collider(s)' density and volume (§6) and never re-derived afterward
/// (the source does not support runtime mass edits).
#[derive(Copy, Clone, Debug)]
pub struct MassProperties {
    pub mass: Real,
    pub inv_mass: Real,
    /// Inverse inertia tensor about the body's own center of mass, in the
    /// body's *local* frame.
    pub inv_inertia_local: SdpMatrix3,
}

impl MassProperties {
    pub fn new(mass: Real, inertia_local: SdpMatrix3) -> Self {
        Self {
            mass,
            inv_mass: crate::utils::inv(mass),
            inv_inertia_local: inertia_local.inverse(),
        }
    }
}

impl Default for MassProperties {
    fn default() -> Self {
        Self { mass: 0.0, inv_mass: 0.0, inv_inertia_local: SdpMatrix3::zero() }
    }
}

/// A dynamic rigid body. One per dynamic collider; a compound's
/// components all share one (§3).
#[derive(Clone, Debug)]
pub struct RigidBody {
    pub transform: Isometry,
    pub prev_transform: Isometry,

    pub linear_velocity: Vector,
    pub angular_velocity: Vector,

    pub mass_properties: MassProperties,
    /// World-space inverse inertia tensor, recomputed every integration
    /// step from `mass_properties.inv_inertia_local` and the current
    /// orientation (`R * I^-1 * R^t`).
    pub inv_inertia_world: SdpMatrix3,

    pub force: Vector,
    pub torque: Vector,

    /// Accumulated this-step displacement, applied to `transform` at the
    /// end of [`RigidBody::integrate`] (§4.8 step 1/3).
    delta_position: Vector,
    delta_orientation: AngVector,
    /// Sleep-eligibility motion EWMA (§4.8 step 2).
    pub motion: Real,
    active: bool,
    can_sleep: bool,

    /// The collider driving this body's AABB and narrow-phase queries; for
    /// a compound body this is the compound collider itself.
    pub collider: ColliderHandle,
    pub island: Option<u32>,
    /// Colliders this body's own collider(s) never narrow-phase against,
    /// e.g. sibling components of the same compound (§6 `add_compound`).
    pub disabled_collisions: Vec<ColliderHandle>,
}

impl RigidBody {
    pub fn new(transform: Isometry, mass_properties: MassProperties, collider: ColliderHandle) -> Self {
        let inv_inertia_world = mass_properties.inv_inertia_local.quadform(&transform.rotation.to_rotation_matrix().into_inner());
        Self {
            transform,
            prev_transform: transform,
            linear_velocity: Vector::zeros(),
            angular_velocity: Vector::zeros(),
            mass_properties,
            inv_inertia_world,
            force: Vector::zeros(),
            torque: Vector::zeros(),
            delta_position: Vector::zeros(),
            delta_orientation: AngVector::zeros(),
            motion: 0.0,
            active: true,
            can_sleep: true,
            collider,
            island: None,
            disabled_collisions: vec![collider],
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn add_force(&mut self, force: Vector) {
        self.force += force;
    }

    pub fn add_force_at_point(&mut self, force: Vector, point: Vector) {
        self.force += force;
        let r = point - self.transform.translation.vector;
        self.torque += r.cross(&force);
    }

    pub fn activate(&mut self, least_motion: Real) {
        self.active = true;
        self.motion = least_motion;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.linear_velocity = Vector::zeros();
        self.angular_velocity = Vector::zeros();
        self.force = Vector::zeros();
        self.torque = Vector::zeros();
    }

    fn clear_forces(&mut self) {
        self.force = Vector::zeros();
        self.torque = Vector::zeros();
    }

    /// Semi-implicit Euler step with sleep (§4.8). Returns the relative
    /// transform `newT * prevT^-1` the caller must propagate to this
    /// body's collider geometry (and onward to a compound's components),
    /// or `None` if the body fell asleep this step (in which case no
    /// geometry moved and the caller must not run broad/narrow phase for
    /// it).
    pub fn integrate(&mut self, settings: &RigidBodySettings, dt: Real) -> Option<Isometry> {
        self.delta_position += self.linear_velocity * dt;
        self.delta_orientation += self.angular_velocity * dt;

        if self.can_sleep {
            let decay = 0.5f32.powf(dt);
            let sample = self.delta_position.norm_squared() + self.delta_orientation.norm_squared();
            self.motion = decay * self.motion + (1.0 - decay) * sample;

            if self.motion < settings.sleep_epsilon {
                self.deactivate();
                return None;
            }
            self.motion = self.motion.min(settings.max_motion);
        }

        self.prev_transform = self.transform;
        let new_translation = Translation::from(self.transform.translation.vector + self.delta_position);
        let new_rotation = crate::utils::rotation_quaternion(self.delta_orientation) * self.transform.rotation;
        self.transform = Isometry::from_parts(new_translation, new_rotation.normalize());
        self.delta_position = Vector::zeros();
        self.delta_orientation = AngVector::zeros();

        let relative = self.transform * self.prev_transform.inverse();

        self.linear_velocity += (settings.gravity + self.force * self.mass_properties.inv_mass) * dt;
        self.angular_velocity += self.inv_inertia_world.mul_vector(self.torque) * dt;
        self.linear_velocity *= settings.linear_damping.powf(dt);
        self.angular_velocity *= settings.angular_damping.powf(dt);
        self.clear_forces();

        self.inv_inertia_world = self
            .mass_properties
            .inv_inertia_local
            .quadform(&self.transform.rotation.to_rotation_matrix().into_inner());

        Some(relative)
    }

    /// Sub-step to fractional time `t` within `[prevTransform, transform]`
    /// after CCD located a time of impact (§4.6, §4.8): the interpolated
    /// pose becomes the new current transform outright, clamping the body
    /// back to its time-of-impact pose. Returns the geometry delta
    /// (`interpolated * old_transform^-1`) so the caller can apply the
    /// same correction to every collider this body drives.
    pub fn sub_step(&mut self, t: Real) -> Isometry {
        let interpolated = self.prev_transform.lerp_slerp(&self.transform, t);
        let delta = interpolated * self.transform.inverse();
        self.transform = interpolated;
        delta
    }
}

trait LerpSlerp {
    fn lerp_slerp(&self, end: &Self, t: Real) -> Isometry;
}

impl LerpSlerp for Isometry {
    fn lerp_slerp(&self, end: &Self, t: Real) -> Isometry {
        let translation = Translation::from(self.translation.vector.lerp(&end.translation.vector, t));
        let rotation = self.rotation.slerp(&end.rotation, t);
        Isometry::from_parts(translation, rotation)
    }
}

/// Global, configurable constants the integrator and sleep logic consult
/// (§6); owned by the world, not a process singleton (§9 "global mutable
/// state").
#[derive(Copy, Clone, Debug)]
pub struct RigidBodySettings {
    pub gravity: Vector,
    pub linear_damping: Real,
    pub angular_damping: Real,
    pub sleep_epsilon: Real,
    pub max_motion: Real,
    pub least_motion: Real,
}

impl Default for RigidBodySettings {
    fn default() -> Self {
        Self {
            gravity: crate::math::default_gravity(),
            linear_damping: 1.0,
            angular_damping: 1.0,
            sleep_epsilon: 1.0e-4,
            max_motion: 0.5,
            least_motion: 0.2,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn body_at(y: Real) -> RigidBody {
        RigidBody::new(
            Isometry::translation(0.0, y, 0.0),
            MassProperties::new(1.0, SdpMatrix3::identity()),
            ColliderHandle::default(),
        )
    }

    #[test]
    fn falling_body_accumulates_downward_velocity() {
        let settings = RigidBodySettings::default();
        let mut body = body_at(5.0);
        body.can_sleep = false;
        for _ in 0..10 {
            body.integrate(&settings, 1.0 / 60.0);
        }
        assert!(body.linear_velocity.y < 0.0);
        assert!(body.transform.translation.vector.y < 5.0);
    }

    #[test]
    fn resting_body_falls_asleep() {
        let settings = RigidBodySettings::default();
        let mut body = body_at(0.0);
        body.linear_velocity = Vector::zeros();
        for _ in 0..600 {
            if body.integrate(&settings, 1.0 / 60.0).is_none() {
                break;
            }
        }
        assert!(!body.is_active());
    }

    #[test]
    fn sub_step_clamps_to_the_interpolated_pose() {
        let mut body = body_at(0.0);
        body.prev_transform = Isometry::translation(0.0, 0.0, 0.0);
        body.transform = Isometry::translation(0.0, 1.0, 0.0);
        let delta = body.sub_step(0.5);
        assert!((body.transform.translation.vector.y - 0.5).abs() < 1.0e-4);
        assert!((delta.translation.vector.y - (-0.5)).abs() < 1.0e-4);
    }
}
