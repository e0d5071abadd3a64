//! Depth-bounded octree broad phase (§4.3). Children are created lazily;
//! an entity's AABB may straddle up to eight leaves.

use crate::geometry::aabb::{Aabb, AabbRelation};
use crate::math::Point;
use arrayvec::ArrayVec;
use rustc_hash::FxHashSet;

/// Opaque entity identifier the broad phase tracks; callers convert their
/// own handle type (e.g. a `ColliderHandle`) to/from this with
/// `slotmap::Key::data().as_ffi()`.
pub type EntityId = u64;

const MAX_RESIDENT_LEAVES: usize = 8;

struct OctreeNode {
    aabb: Aabb,
    parent: Option<u32>,
    children: [Option<u32>; 8],
    entities: FxHashSet<EntityId>,
}

impl OctreeNode {
    fn new(aabb: Aabb, parent: Option<u32>) -> Self {
        Self {
            aabb,
            parent,
            children: [None; 8],
            entities: FxHashSet::default(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }
}

/// A node exposed to callers that want to inspect the tree's shape (tests,
/// debug rendering) without reaching into the private arena.
#[derive(Copy, Clone, Debug)]
pub struct OctreeNodeView {
    pub aabb: Aabb,
    pub entity_count: usize,
}

/// The spatial broad phase: a fixed-depth octree over a fixed world AABB.
pub struct Octree {
    nodes: Vec<Option<OctreeNode>>,
    free: Vec<u32>,
    max_depth: u32,
    height_field: Option<(EntityId, Aabb)>,
}

impl Octree {
    pub fn new(world_aabb: Aabb, depth: u32) -> Self {
        Self {
            nodes: vec![Some(OctreeNode::new(world_aabb, None))],
            free: Vec::new(),
            max_depth: depth,
            height_field: None,
        }
    }

    pub fn root(&self) -> u32 {
        0
    }

    pub fn node(&self, index: u32) -> Option<OctreeNodeView> {
        self.nodes[index as usize].as_ref().map(|n| OctreeNodeView {
            aabb: n.aabb,
            entity_count: n.entities.len(),
        })
    }

    /// Registers the world's height field as a "virtual global static
    /// entity": every leaf overlapping `aabb`, now or in the future,
    /// carries `id` in its entity set (§4.3).
    pub fn initialise_height_field(&mut self, id: EntityId, aabb: Aabb) {
        self.height_field = Some((id, aabb));
        self.insert(id, aabb);
    }

    /// Recursive descent from the root (§4.3 `Insert`). Returns the leaves
    /// the entity was placed in.
    pub fn insert(&mut self, entity: EntityId, aabb: Aabb) -> ArrayVec<u32, 8> {
        let mut leaves = ArrayVec::new();
        self.insert_at(self.root(), self.max_depth, entity, aabb, &mut leaves);
        leaves
    }

    fn insert_at(
        &mut self,
        node_idx: u32,
        depth_remaining: u32,
        entity: EntityId,
        aabb: Aabb,
        leaves: &mut ArrayVec<u32, 8>,
    ) {
        if depth_remaining == 0 {
            self.node_mut(node_idx).entities.insert(entity);
            if leaves.try_push(node_idx).is_err() {
                debug_assert!(
                    false,
                    "entity {} resides in more than {} octree leaves; enlarge the world AABB or reduce depth",
                    entity, MAX_RESIDENT_LEAVES
                );
                log::error!(
                    "octree: entity {} exceeded the {}-leaf residency cap, dropping extra leaves",
                    entity,
                    MAX_RESIDENT_LEAVES
                );
            }
            return;
        }

        for octant in 0..8u8 {
            let octant_aabb = octant_bounds(self.node(node_idx).unwrap().aabb, octant);
            let relation = octant_aabb.evaluate(&aabb);
            if relation == AabbRelation::Disjoint {
                continue;
            }
            let child_idx = self.child_or_create(node_idx, octant, octant_aabb);
            self.insert_at(child_idx, depth_remaining - 1, entity, aabb, leaves);
            if relation == AabbRelation::Contained {
                break;
            }
        }
    }

    fn child_or_create(&mut self, node_idx: u32, octant: u8, octant_aabb: Aabb) -> u32 {
        if let Some(existing) = self.node_mut(node_idx).children[octant as usize] {
            return existing;
        }
        let child_idx = self.alloc_node(OctreeNode::new(octant_aabb, Some(node_idx)));
        self.node_mut(node_idx).children[octant as usize] = Some(child_idx);
        if let Some((id, hf_aabb)) = self.height_field {
            if octant_aabb.intersects(&hf_aabb) {
                self.node_mut(child_idx).entities.insert(id);
            }
        }
        child_idx
    }

    fn alloc_node(&mut self, node: OctreeNode) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            (self.nodes.len() - 1) as u32
        }
    }

    fn node_mut(&mut self, idx: u32) -> &mut OctreeNode {
        self.nodes[idx as usize].as_mut().unwrap()
    }

    /// Erases the entity from one leaf, terminating the leaf (and any
    /// now-empty ancestors) if it was its last resident.
    pub fn erase(&mut self, entity: EntityId, leaf: u32) {
        if self.nodes[leaf as usize].is_none() {
            return;
        }
        self.node_mut(leaf).entities.remove(&entity);
        if self.node(leaf).unwrap().entity_count == 0 && self.is_leaf(leaf) {
            self.terminate(leaf);
        }
    }

    fn is_leaf(&self, idx: u32) -> bool {
        self.nodes[idx as usize].as_ref().map_or(false, |n| n.is_leaf())
    }

    /// Erase `leaf` from its parent's child slots; if the parent now has
    /// zero children left, recurse upward (§4.3 `Terminate`).
    pub fn terminate(&mut self, leaf: u32) {
        if leaf == self.root() {
            return; // the root is never terminated
        }
        let parent = match self.nodes[leaf as usize].as_ref().and_then(|n| n.parent) {
            Some(p) => p,
            None => return,
        };
        self.nodes[leaf as usize] = None;
        self.free.push(leaf);

        let parent_node = self.node_mut(parent);
        for slot in parent_node.children.iter_mut() {
            if *slot == Some(leaf) {
                *slot = None;
            }
        }
        let parent_empty = parent_node.children.iter().all(|c| c.is_none())
            && parent_node.entities.is_empty();
        if parent_empty {
            self.terminate(parent);
        }
    }

    /// Discrete update (§4.3): prune reference leaves the entity no longer
    /// overlaps, then -- if the entity moved outside all remaining
    /// reference leaves -- re-resolve its leaves with a full root descent.
    ///
    /// A 25-neighbour local walk from the reference leaves up to their
    /// common ancestor would be a locality optimisation over a full
    /// re-descent; this falls back to the full descent instead, which is
    /// behaviourally identical, just without that speedup.
    pub fn discrete_update(
        &mut self,
        entity: EntityId,
        reference_leaves: &[u32],
        new_aabb: Aabb,
    ) -> ArrayVec<u32, 8> {
        let mut remaining: ArrayVec<u32, 8> = ArrayVec::new();
        for &leaf in reference_leaves {
            let still_overlaps = self
                .nodes
                .get(leaf as usize)
                .and_then(|n| n.as_ref())
                .map_or(false, |n| n.aabb.intersects(&new_aabb));
            if still_overlaps {
                let _ = remaining.try_push(leaf);
            } else {
                self.erase(entity, leaf);
            }
        }

        let fully_covered = remaining.iter().any(|&leaf| {
            self.nodes[leaf as usize]
                .as_ref()
                .map_or(false, |n| n.aabb.contains(&new_aabb))
        });

        if fully_covered && !remaining.is_empty() {
            return remaining;
        }

        self.insert(entity, new_aabb)
    }

    /// Continuous update (§4.3): unconditionally erase and re-insert from
    /// the root, since a CCD sub-step may have moved the entity far from
    /// its previous leaves.
    pub fn continuous_update(
        &mut self,
        entity: EntityId,
        reference_leaves: &[u32],
        new_aabb: Aabb,
    ) -> ArrayVec<u32, 8> {
        for &leaf in reference_leaves {
            self.erase(entity, leaf);
        }
        self.insert(entity, new_aabb)
    }

    /// All distinct entities whose residency overlaps `query`, walking
    /// down from the root and pruning disjoint subtrees.
    pub fn query(&self, query: Aabb) -> FxHashSet<EntityId> {
        let mut out = FxHashSet::default();
        self.query_at(self.root(), query, &mut out);
        out
    }

    fn query_at(&self, node_idx: u32, query: Aabb, out: &mut FxHashSet<EntityId>) {
        let node = match &self.nodes[node_idx as usize] {
            Some(n) => n,
            None => return,
        };
        if !node.aabb.intersects(&query) {
            return;
        }
        out.extend(node.entities.iter().copied());
        for child in node.children.iter().flatten() {
            self.query_at(*child, query, out);
        }
    }
}

/// The AABB of octant `index` (0..8, bit 0 = +x, bit 1 = +y, bit 2 = +z)
/// within `parent`.
fn octant_bounds(parent: Aabb, index: u8) -> Aabb {
    let center = parent.center();
    let lo = parent.min;
    let hi = parent.max;
    let pick = |bit: u8, lo: f32, mid: f32, hi: f32| {
        if index & bit != 0 {
            (mid, hi)
        } else {
            (lo, mid)
        }
    };
    let (xmin, xmax) = pick(1, lo.x, center.x, hi.x);
    let (ymin, ymax) = pick(2, lo.y, center.y, hi.y);
    let (zmin, zmax) = pick(4, lo.z, center.z, hi.z);
    Aabb::new(Point::new(xmin, ymin, zmin), Point::new(xmax, ymax, zmax))
}

#[cfg(test)]
mod test {
    use super::*;

    fn world() -> Octree {
        Octree::new(
            Aabb::new(Point::new(-64.0, -64.0, -64.0), Point::new(64.0, 64.0, 64.0)),
            4,
        )
    }

    #[test]
    fn insert_and_query_finds_the_entity() {
        let mut tree = world();
        let aabb = Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let leaves = tree.insert(1, aabb);
        assert!(!leaves.is_empty());
        let found = tree.query(aabb);
        assert!(found.contains(&1));
    }

    #[test]
    fn disjoint_query_finds_nothing() {
        let mut tree = world();
        tree.insert(1, Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0)));
        let found = tree.query(Aabb::new(
            Point::new(-60.0, -60.0, -60.0),
            Point::new(-59.0, -59.0, -59.0),
        ));
        assert!(!found.contains(&1));
    }

    #[test]
    fn continuous_update_relocates_to_the_new_position() {
        let mut tree = world();
        let start = Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let leaves = tree.insert(1, start);
        let moved = Aabb::new(Point::new(40.0, 40.0, 40.0), Point::new(41.0, 41.0, 41.0));
        let new_leaves = tree.continuous_update(1, &leaves, moved);
        assert!(tree.query(moved).contains(&1));
        assert!(!tree.query(start).contains(&1));
        assert!(!new_leaves.is_empty());
    }

    #[test]
    fn terminate_prunes_empty_ancestors() {
        let mut tree = world();
        let aabb = Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let leaves = tree.insert(1, aabb);
        for leaf in leaves {
            tree.erase(1, leaf);
        }
        assert!(tree.query(aabb).is_empty());
    }

    #[test]
    fn octree_soundness_matches_brute_force_after_many_mutations() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand_pcg::Pcg32::seed_from_u64(7);
        let mut tree = world();
        let mut brute: std::collections::HashMap<EntityId, (Aabb, ArrayVec<u32, 8>)> =
            std::collections::HashMap::new();

        for id in 0..200u64 {
            let x = rng.gen_range(-60.0..60.0f32);
            let y = rng.gen_range(-60.0..60.0f32);
            let z = rng.gen_range(-60.0..60.0f32);
            let aabb = Aabb::new(Point::new(x, y, z), Point::new(x + 1.0, y + 1.0, z + 1.0));
            let leaves = tree.insert(id, aabb);
            brute.insert(id, (aabb, leaves));
        }

        for _ in 0..100 {
            let id = rng.gen_range(0..200u64);
            let (old_aabb, leaves) = brute.get(&id).unwrap().clone();
            let x = rng.gen_range(-60.0..60.0f32);
            let y = rng.gen_range(-60.0..60.0f32);
            let z = rng.gen_range(-60.0..60.0f32);
            let new_aabb = Aabb::new(Point::new(x, y, z), Point::new(x + 1.0, y + 1.0, z + 1.0));
            let new_leaves = tree.discrete_update(id, &leaves, new_aabb);
            let _ = old_aabb;
            brute.insert(id, (new_aabb, new_leaves));
        }

        let probe = Aabb::new(Point::new(-5.0, -5.0, -5.0), Point::new(5.0, 5.0, 5.0));
        let from_tree = tree.query(probe);
        let from_brute: FxHashSet<EntityId> = brute
            .iter()
            .filter(|(_, (aabb, _))| aabb.intersects(&probe))
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(from_tree, from_brute);
    }
}
