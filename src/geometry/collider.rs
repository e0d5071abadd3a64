use crate::dynamics::RigidBodyHandle;
use crate::geometry::aabb::Aabb;
use crate::geometry::shape::{Shape, ShapeKind};
use crate::math::{Isometry, Real};

slotmap::new_key_type! {
    /// Stable, process-wide identifier for a collider; the only handle
    /// used across subsystems (§3). Backed by a [`slotmap::SlotMap`] slot:
    /// indices are reused after an `erase` but the generation tag means a
    /// stale handle is never silently mistaken for a new collider in the
    /// same slot.
    pub struct ColliderHandle;
}

/// Whether a collider is attached to a simulated rigid body or fixed in
/// the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColliderMotionState {
    Motionless,
    Dynamic,
}

/// `{density, restitution, frictionSqrt}` -- friction is stored pre-sqrt so
/// that combining two materials' friction is a single multiply (§6).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsMaterial {
    pub density: Real,
    pub restitution: Real,
    pub friction_sqrt: Real,
}

impl PhysicsMaterial {
    pub fn new(density: Real, restitution: Real, friction: Real) -> Self {
        Self {
            density,
            restitution,
            friction_sqrt: friction.max(0.0).sqrt(),
        }
    }

    /// Combined Coulomb friction coefficient for a pair of materials.
    pub fn combined_friction(&self, other: &PhysicsMaterial) -> Real {
        self.friction_sqrt * other.friction_sqrt
    }

    /// Combined restitution: the source takes the lesser of the two
    /// (§ contactConstraint.cpp), not the product or average.
    pub fn combined_restitution(&self, other: &PhysicsMaterial) -> Real {
        self.restitution.min(other.restitution)
    }
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.5)
    }
}

/// One collider: a shape, its material, its motion state, its cached
/// world-space AABB, and -- for dynamic colliders -- a link to the owning
/// rigid body.
#[derive(Clone, Debug)]
pub struct Collider {
    pub shape: Shape,
    pub material: PhysicsMaterial,
    pub motion_state: ColliderMotionState,
    pub position: Isometry,
    pub aabb: Aabb,
    pub body: Option<RigidBodyHandle>,
    /// The leaves of the broad-phase octree this collider's AABB currently
    /// overlaps, used to prune/update without re-descending from the root
    /// (§4.3).
    pub(crate) octree_leaves: arrayvec::ArrayVec<u32, 8>,
}

impl Collider {
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn recompute_aabb(&mut self) {
        self.aabb = match &self.shape {
            Shape::Convex(c) => c.transform_by(&self.position).aabb(),
            Shape::TriangleMesh(m) => m.aabb(),
            Shape::HeightField(h) => h.aabb(),
            Shape::Compound(_) => self.aabb, // recomputed explicitly by the owner, see dynamics::integrator
        };
    }

    /// Applies a relative transform `delta = new_t * prev_t^-1` to this
    /// collider's cached world pose, mirroring `RigidBody::subStep`'s
    /// `colliderTransformer.transform` call (§4.8).
    pub fn apply_relative_transform(&mut self, delta: &Isometry) {
        self.position = delta * self.position;
        self.recompute_aabb();
    }
}

/// Builder for [`Collider`]s, collecting the handful of optional knobs
/// (local offset, material) the `add_*` world entry points (§6) accept.
pub struct ColliderBuilder {
    pub shape: Shape,
    pub material: PhysicsMaterial,
    pub motion_state: ColliderMotionState,
    pub offset: Isometry,
}

impl ColliderBuilder {
    pub fn new(shape: Shape, motion_state: ColliderMotionState) -> Self {
        Self {
            shape,
            material: PhysicsMaterial::default(),
            motion_state,
            offset: Isometry::identity(),
        }
    }

    pub fn material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn offset(mut self, offset: Isometry) -> Self {
        self.offset = offset;
        self
    }

    pub fn build(self) -> Collider {
        let mut collider = Collider {
            shape: self.shape,
            material: self.material,
            motion_state: self.motion_state,
            position: self.offset,
            aabb: Aabb::invalid(),
            body: None,
            octree_leaves: arrayvec::ArrayVec::new(),
        };
        collider.recompute_aabb();
        collider
    }
}

/// Index-stable arena of every collider in the world.
#[derive(Default)]
pub struct ColliderSet {
    colliders: slotmap::SlotMap<ColliderHandle, Collider>,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self {
            colliders: slotmap::SlotMap::with_key(),
        }
    }

    pub fn insert(&mut self, collider: Collider) -> ColliderHandle {
        self.colliders.insert(collider)
    }

    pub fn remove(&mut self, handle: ColliderHandle) -> Option<Collider> {
        self.colliders.remove(handle)
    }

    pub fn get(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn get_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        self.colliders.get_mut(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColliderHandle, &Collider)> {
        self.colliders.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ColliderHandle, &mut Collider)> {
        self.colliders.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.len() == 0
    }
}
