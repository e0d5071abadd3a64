//! Arena owning every [`RigidBody`] (§3): a `slotmap` keyed by
//! [`RigidBodyHandle`], mirroring [`crate::geometry::collider::ColliderSet`].

use super::rigid_body::{RigidBody, RigidBodyHandle};
use slotmap::SlotMap;

#[derive(Default)]
pub struct RigidBodySet {
    bodies: SlotMap<RigidBodyHandle, RigidBody>,
}

impl RigidBodySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    pub fn remove(&mut self, handle: RigidBodyHandle) -> Option<RigidBody> {
        self.bodies.remove(handle)
    }

    pub fn get(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn get_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Mutable access to two distinct bodies at once, as every constraint
    /// solve needs (§4.9). Panics if `a == b`, which no constraint ever
    /// legitimately targets.
    pub fn get_pair_mut(&mut self, a: RigidBodyHandle, b: RigidBodyHandle) -> (Option<&mut RigidBody>, Option<&mut RigidBody>) {
        assert_ne!(a, b, "a constraint may not reference the same body twice");
        self.bodies.get_disjoint_mut([a, b]).map(|[x, y]| (x, y)).unwrap_or_else(|| {
            // One or both handles are stale; fall back to individual lookups
            // so the caller still sees None rather than a false pair.
            (self.bodies.get_mut(a), None)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (RigidBodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RigidBodyHandle, &mut RigidBody)> {
        self.bodies.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::rigid_body::MassProperties;
    use crate::geometry::ColliderHandle;
    use crate::math::Isometry;
    use crate::utils::SdpMatrix3;

    fn body() -> RigidBody {
        RigidBody::new(Isometry::identity(), MassProperties::new(1.0, SdpMatrix3::identity()), ColliderHandle::default())
    }

    #[test]
    fn insert_then_get_round_trips() {
        let mut set = RigidBodySet::new();
        let h = set.insert(body());
        assert!(set.get(h).is_some());
        set.remove(h);
        assert!(set.get(h).is_none());
    }

    #[test]
    fn get_pair_mut_returns_both_distinct_bodies() {
        let mut set = RigidBodySet::new();
        let a = set.insert(body());
        let b = set.insert(body());
        let (ra, rb) = set.get_pair_mut(a, b);
        assert!(ra.is_some());
        assert!(rb.is_some());
    }
}
