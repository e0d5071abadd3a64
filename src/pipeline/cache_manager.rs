//! Retention-counted impulse cache (§4.10): keeps the previous step's
//! accumulated normal/tangent impulses per contact pair so the solver can
//! warm-start instead of starting every step from zero.

use crate::dynamics::solver::ContactConstraint;
use crate::geometry::{ContactId, ColliderHandle};
use crate::math::Real;
use rustc_hash::FxHashMap;

type PairKey = (ColliderHandle, ColliderHandle);

#[derive(Default)]
struct PairCache {
    impulses: FxHashMap<ContactId, (Real, Real, Real)>,
    retain: u32,
}

/// Owns every pair's [`ContactId`]-keyed impulse history, aged by one
/// frame per step and dropped once its retention counter reaches zero
/// (§4.10 "decrement the retention counter of every entry ... entries at
/// zero are removed").
#[derive(Default)]
pub struct CacheManager {
    pairs: FxHashMap<PairKey, PairCache>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: ColliderHandle, b: ColliderHandle) -> PairKey {
        use slotmap::Key;
        if a.data().as_ffi() <= b.data().as_ffi() {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Impulses cached for `(a, b)` from a previous step, or an empty map
    /// if this pair has no cache entry (new contact, or its entry aged
    /// out).
    pub fn lookup(&self, a: ColliderHandle, b: ColliderHandle) -> FxHashMap<ContactId, (Real, Real, Real)> {
        self.pairs
            .get(&Self::key(a, b))
            .map(|c| c.impulses.clone())
            .unwrap_or_default()
    }

    /// Stores this step's solved impulses for `(a, b)` and resets its
    /// retention counter (§4.9 step 4, "store accumulated impulses in the
    /// cache; set retention counter").
    pub fn store(&mut self, a: ColliderHandle, b: ColliderHandle, constraint: &ContactConstraint, frames_to_retain: u32) {
        let entry = self.pairs.entry(Self::key(a, b)).or_default();
        entry.impulses.clear();
        entry.impulses.extend(constraint.impulses());
        entry.retain = frames_to_retain;
    }

    /// Drops the cache for a pair that left the world, e.g. when a
    /// collider is removed.
    pub fn forget_pair(&mut self, a: ColliderHandle, b: ColliderHandle) {
        self.pairs.remove(&Self::key(a, b));
    }

    /// Ages every entry by one step, removing any whose retention counter
    /// hits zero (§4.10).
    pub fn age(&mut self) {
        self.pairs.retain(|_, c| {
            c.retain = c.retain.saturating_sub(1);
            c.retain > 0
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_colliders() -> (ColliderHandle, ColliderHandle, crate::geometry::ColliderSet) {
        let mut colliders = crate::geometry::ColliderSet::new();
        let ball = || {
            crate::geometry::ColliderBuilder::new(
                crate::geometry::Shape::Convex(crate::geometry::ConvexShape::Ball(
                    crate::geometry::Ball::new(1.0),
                    crate::math::Point::origin(),
                )),
                crate::geometry::ColliderMotionState::Dynamic,
            )
            .build()
        };
        let c1 = colliders.insert(ball());
        let c2 = colliders.insert(ball());
        (c1, c2, colliders)
    }

    #[test]
    fn lookup_is_symmetric_in_pair_order() {
        let (c1, c2, _colliders) = two_colliders();
        let cache = CacheManager::new();
        assert!(cache.lookup(c1, c2).is_empty());
        assert_eq!(CacheManager::key(c1, c2), CacheManager::key(c2, c1));
    }

    #[test]
    fn entries_are_removed_once_retention_expires() {
        let (c1, c2, _colliders) = two_colliders();
        let mut cache = CacheManager::new();

        let empty = FxHashMap::default();
        let manifold = crate::geometry::ContactManifold::new(Default::default(), Default::default());
        let settings = crate::dynamics::solver::ContactSolverSettings::default();
        let constraint = ContactConstraint::new(&manifold, None, None, &settings, &empty);
        cache.store(c1, c2, &constraint, 2);
        assert!(!cache.pairs.is_empty());

        cache.age();
        assert!(!cache.pairs.is_empty());
        cache.age();
        assert!(cache.pairs.is_empty());
    }
}
