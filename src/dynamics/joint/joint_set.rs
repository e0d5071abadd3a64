//! Arena of joints (§4.9, §6 `add_hinge_joint`/`add_cone_joint`/
//! `add_motor_joint`), mirroring [`crate::dynamics::rigid_body_set::RigidBodySet`]:
//! a `slotmap` keyed by [`JointHandle`] rather than an intrusive list, so a
//! joint referencing a removed body is simply skipped at solve time instead
//! of requiring the body to know about its joints.

use super::{Cone, Hinge, Motor};
use crate::dynamics::rigid_body::RigidBodyHandle;
use slotmap::SlotMap;

slotmap::new_key_type! {
    pub struct JointHandle;
}

/// The three joint descriptions a world may attach between a pair of
/// bodies (§4.9 "Hinge: ...", "Cone: ...", "Motor: ...").
pub enum JointKind {
    Hinge(Hinge),
    Cone(Cone),
    Motor(Motor),
}

pub struct Joint {
    pub body1: RigidBodyHandle,
    pub body2: RigidBodyHandle,
    pub kind: JointKind,
}

#[derive(Default)]
pub struct JointSet {
    joints: SlotMap<JointHandle, Joint>,
}

impl JointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body1: RigidBodyHandle, body2: RigidBodyHandle, kind: JointKind) -> JointHandle {
        self.joints.insert(Joint { body1, body2, kind })
    }

    pub fn remove(&mut self, handle: JointHandle) -> Option<Joint> {
        self.joints.remove(handle)
    }

    pub fn get(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joints.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{Point, Vector};

    #[test]
    fn insert_then_get_round_trips() {
        let mut bodies: SlotMap<RigidBodyHandle, ()> = SlotMap::with_key();
        let a = bodies.insert(());
        let b = bodies.insert(());

        let mut joints = JointSet::new();
        let hinge = Hinge::new(Point::origin(), Point::origin(), Vector::y(), Vector::y());
        let handle = joints.insert(a, b, JointKind::Hinge(hinge));

        assert!(joints.get(handle).is_some());
        joints.remove(handle);
        assert!(joints.get(handle).is_none());
    }
}
