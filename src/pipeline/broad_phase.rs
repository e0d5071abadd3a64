//! World-level wrapper around [`Octree`] (§4.3): converts between
//! [`ColliderHandle`] and the [`EntityId`] the octree itself speaks, and
//! turns a set of per-collider overlap queries into a deduplicated list of
//! candidate pairs for the narrow phase.

use crate::geometry::{Aabb, ColliderHandle, ColliderSet, ColliderMotionState, EntityId, Octree};
use rustc_hash::FxHashSet;

pub fn entity_id_of(handle: ColliderHandle) -> EntityId {
    use slotmap::Key;
    handle.data().as_ffi()
}

pub fn handle_of(entity: EntityId) -> ColliderHandle {
    ColliderHandle::from(slotmap::KeyData::from_ffi(entity))
}

/// Registers a newly-inserted collider with the octree, recording the
/// leaves it lands in on the collider itself (§4.3 "insert").
pub fn register(octree: &mut Octree, colliders: &mut ColliderSet, handle: ColliderHandle) {
    let Some(collider) = colliders.get(handle) else { return };
    let aabb = collider.aabb;
    let leaves = octree.insert(entity_id_of(handle), aabb);
    if let Some(collider) = colliders.get_mut(handle) {
        collider.octree_leaves = leaves;
    }
}

/// Re-homes a collider whose AABB changed this step, choosing the
/// continuous (swept) update for CCD-active colliders and the cheaper
/// discrete one otherwise (§4.3, §4.7).
pub fn relocate(octree: &mut Octree, colliders: &mut ColliderSet, handle: ColliderHandle, continuous: bool) {
    let Some(collider) = colliders.get(handle) else { return };
    let entity = entity_id_of(handle);
    let aabb = collider.aabb;
    let reference = collider.octree_leaves.clone();
    let leaves = if continuous {
        octree.continuous_update(entity, &reference, aabb)
    } else {
        octree.discrete_update(entity, &reference, aabb)
    };
    if let Some(collider) = colliders.get_mut(handle) {
        collider.octree_leaves = leaves;
    }
}

pub fn unregister(octree: &mut Octree, colliders: &ColliderSet, handle: ColliderHandle) {
    let Some(collider) = colliders.get(handle) else { return };
    for &leaf in &collider.octree_leaves {
        octree.erase(entity_id_of(handle), leaf);
    }
}

/// Every other collider whose AABB overlaps `handle`'s, deduplicated
/// against colliders already visited this sweep so each unordered pair is
/// proposed to the narrow phase exactly once (§4.3, §4.5).
pub fn candidates_for(octree: &Octree, colliders: &ColliderSet, handle: ColliderHandle, already_swept: &FxHashSet<ColliderHandle>) -> Vec<ColliderHandle> {
    let Some(collider) = colliders.get(handle) else { return Vec::new() };
    let aabb: Aabb = collider.aabb;
    octree
        .query(aabb)
        .into_iter()
        .map(handle_of)
        .filter(|&other| other != handle && !already_swept.contains(&other))
        .filter(|&other| colliders.get(other).is_some())
        .collect()
}

/// Whether a pair is even worth narrow-phasing: two motionless colliders
/// never move relative to each other, and siblings of the same compound
/// or rigid body are pre-disabled (§6 `add_compound`).
pub fn pair_is_relevant(colliders: &ColliderSet, a: ColliderHandle, b: ColliderHandle, disabled: &[ColliderHandle]) -> bool {
    let (Some(ca), Some(cb)) = (colliders.get(a), colliders.get(b)) else { return false };
    if ca.motion_state == ColliderMotionState::Motionless && cb.motion_state == ColliderMotionState::Motionless {
        return false;
    }
    !disabled.contains(&b)
}
