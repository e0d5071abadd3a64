//! Islands (§3, §9): groups of rigid bodies connected by a contact or
//! joint this step, used only to decide sleep/wake as a unit. A
//! union-find over body handles, rebuilt once per step rather than
//! maintained incrementally, since nothing here runs in parallel and a
//! full rebuild is cheap relative to the rest of the step (§9 "no
//! parallel islands").

use super::rigid_body::RigidBodyHandle;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct IslandBuilder {
    parent: FxHashMap<RigidBodyHandle, RigidBodyHandle>,
}

impl IslandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&mut self, h: RigidBodyHandle) -> RigidBodyHandle {
        let p = *self.parent.entry(h).or_insert(h);
        if p == h {
            h
        } else {
            let root = self.find(p);
            self.parent.insert(h, root);
            root
        }
    }

    /// Merges the islands of `a` and `b`, e.g. when they share a contact
    /// or a joint this step.
    pub fn union(&mut self, a: RigidBodyHandle, b: RigidBodyHandle) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }

    /// Assigns every body a small island id, grouping bodies whose roots
    /// coincide. Bodies never unioned with anything still get their own
    /// singleton island.
    pub fn finish(mut self, bodies: impl Iterator<Item = RigidBodyHandle>) -> FxHashMap<RigidBodyHandle, u32> {
        let mut roots: FxHashMap<RigidBodyHandle, u32> = FxHashMap::default();
        let mut result = FxHashMap::default();
        for h in bodies {
            let root = self.find(h);
            let next_id = roots.len() as u32;
            let id = *roots.entry(root).or_insert(next_id);
            result.insert(h, id);
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn unioned_bodies_share_an_island() {
        let mut map: SlotMap<RigidBodyHandle, ()> = SlotMap::with_key();
        let a = map.insert(());
        let b = map.insert(());
        let c = map.insert(());

        let mut builder = IslandBuilder::new();
        builder.union(a, b);
        let islands = builder.finish([a, b, c].into_iter());

        assert_eq!(islands[&a], islands[&b]);
        assert_ne!(islands[&a], islands[&c]);
    }
}
