//! Property test for the broad-phase octree (§4.3): `query` must never
//! miss an entity that brute-force-overlaps the query box, before or
//! after a batch of repositions. `query` is allowed to be conservative
//! (it returns everything in a touched leaf, not a re-filtered exact
//! overlap -- the narrow phase is what narrows that down), so this
//! checks soundness, not exactness.

use mech_physics::geometry::{Aabb, EntityId, Octree};
use mech_physics::math::{Point, Real, Vector};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

fn random_aabb(rng: &mut Pcg32, bound: Real, radius: Real) -> Aabb {
    let cx: Real = rng.gen_range(-bound..bound);
    let cy: Real = rng.gen_range(-bound..bound);
    let cz: Real = rng.gen_range(-bound..bound);
    Aabb::new(Point::new(cx - radius, cy - radius, cz - radius), Point::new(cx + radius, cy + radius, cz + radius))
}

fn assert_query_is_sound(octree: &Octree, aabbs: &[(EntityId, Aabb)], query: Aabb) {
    let found = octree.query(query);
    for &(entity, aabb) in aabbs {
        if aabb.intersects(&query) {
            assert!(found.contains(&entity), "query missed entity {entity} whose aabb truly overlaps it");
        }
    }
}

#[test]
fn octree_query_never_misses_a_true_overlap_after_reinserts() {
    let mut rng = Pcg32::seed_from_u64(0xC0FFEE);
    let world = Aabb::new(Point::new(-64.0, -64.0, -64.0), Point::new(64.0, 64.0, 64.0));
    let mut octree = Octree::new(world, 4);

    let mut aabbs: Vec<(EntityId, Aabb)> = Vec::new();
    let mut reference: Vec<arrayvec::ArrayVec<u32, 8>> = Vec::new();

    for i in 0..1000u64 {
        let aabb = random_aabb(&mut rng, 60.0, 1.0);
        let placed = octree.insert(i, aabb);
        aabbs.push((i, aabb));
        reference.push(placed);
    }

    for query_index in 0..20 {
        let q = random_aabb(&mut rng, 60.0, 4.0 + query_index as Real);
        assert_query_is_sound(&octree, &aabbs, q);
    }

    for i in 0..500usize {
        let shift = Vector::new(1.0, 0.0, 1.0);
        let old = aabbs[i].1;
        let new_aabb = Aabb::new(old.min + shift, old.max + shift);
        let placed = octree.discrete_update(aabbs[i].0, &reference[i], new_aabb);
        aabbs[i].1 = new_aabb;
        reference[i] = placed;
    }

    for query_index in 0..20 {
        let q = random_aabb(&mut rng, 60.0, 4.0 + query_index as Real);
        assert_query_is_sound(&octree, &aabbs, q);
    }
}

#[test]
fn octree_query_stays_sound_after_continuous_updates() {
    let mut rng = Pcg32::seed_from_u64(0xBEEF);
    let world = Aabb::new(Point::new(-64.0, -64.0, -64.0), Point::new(64.0, 64.0, 64.0));
    let mut octree = Octree::new(world, 3);

    let mut aabbs: Vec<(EntityId, Aabb)> = Vec::new();
    let mut reference: Vec<arrayvec::ArrayVec<u32, 8>> = Vec::new();
    for i in 0..200u64 {
        let aabb = random_aabb(&mut rng, 50.0, 1.5);
        let placed = octree.insert(i, aabb);
        aabbs.push((i, aabb));
        reference.push(placed);
    }

    // A continuous update models a sub-stepped CCD body whose new AABB
    // may be far from its old leaves.
    for i in 0..100usize {
        let new_aabb = random_aabb(&mut rng, 50.0, 1.5);
        let placed = octree.continuous_update(aabbs[i].0, &reference[i], new_aabb);
        aabbs[i].1 = new_aabb;
        reference[i] = placed;
    }

    for query_index in 0..10 {
        let q = random_aabb(&mut rng, 50.0, 5.0 + query_index as Real);
        assert_query_is_sound(&octree, &aabbs, q);
    }
}
