//! The world (§5, §6): owns every collider, rigid body and joint, and
//! drives one `update(dt)` at a time through integration, continuous
//! collision detection, broad and narrow phase, and the constraint
//! solver -- mirroring the source's `PhysicsWorld::update` loop, minus
//! the debug-renderer hooks and the parallel island split this crate
//! has no use for (§9 "no parallel islands").

use crate::dynamics::island::IslandBuilder;
use crate::dynamics::joint::{Cone, ConeConstraint, Hinge, HingeConstraint, JointHandle, JointKind, JointSet, Motor, MotorConstraint};
use crate::dynamics::rigid_body::{MassProperties, RigidBody, RigidBodyHandle, RigidBodySettings};
use crate::dynamics::rigid_body_set::RigidBodySet;
use crate::dynamics::solver::{ContactConstraint, Endpoint};
use crate::geometry::narrow_phase::GeneratedManifold;
use crate::geometry::{
    Aabb, Ball, BumpyTerrainParameters, Capsule, ColliderBuilder, ColliderHandle, ColliderMotionState,
    ColliderSet, ConvexHull, ConvexShape, FlatTerrainParameters, HeightField, NarrowPhase, Octree,
    PhysicsMaterial, Shape, ToiStatus, TriangleMesh,
};
use crate::math::{Isometry, Point, Real};
use crate::pipeline::broad_phase;
use crate::pipeline::cache_manager::CacheManager;
use crate::pipeline::errors::WorldError;
use crate::pipeline::integration_parameters::IntegrationParameters;
use crate::utils::SdpMatrix3;
use rustc_hash::FxHashSet;

/// Box-shaped inertia about the hull's own AABB center (§9 design notes:
/// a documented simplification -- the source integrates the true
/// tetrahedron-decomposition tensor over the hull's vertices, which this
/// crate's [`ConvexHull`] does not expose). Callers are expected to pass
/// hulls whose local frame is already roughly centered on their own mass.
fn box_inertia(mass: Real, half_extents: crate::math::Vector) -> SdpMatrix3 {
    let h = half_extents;
    SdpMatrix3 {
        m11: (mass / 3.0) * (h.y * h.y + h.z * h.z),
        m12: 0.0,
        m13: 0.0,
        m22: (mass / 3.0) * (h.x * h.x + h.z * h.z),
        m23: 0.0,
        m33: (mass / 3.0) * (h.x * h.x + h.y * h.y),
    }
}

fn ball_inertia(mass: Real, ball: &Ball) -> SdpMatrix3 {
    let i = ball.local_inertia(mass);
    SdpMatrix3 { m11: i, m12: 0.0, m13: 0.0, m22: i, m23: 0.0, m33: i }
}

/// Either side of a contact or joint as a mutable solver endpoint: the
/// body, if one exists, or [`Endpoint::Fixed`] for a motionless collider.
fn endpoints_mut(bodies: &mut RigidBodySet, body1: Option<RigidBodyHandle>, body2: Option<RigidBodyHandle>) -> (Endpoint<'_>, Endpoint<'_>) {
    match (body1, body2) {
        (Some(a), Some(b)) => {
            let (ra, rb) = bodies.get_pair_mut(a, b);
            (ra.map_or(Endpoint::Fixed, Endpoint::Body), rb.map_or(Endpoint::Fixed, Endpoint::Body))
        }
        (Some(a), None) => (bodies.get_mut(a).map_or(Endpoint::Fixed, Endpoint::Body), Endpoint::Fixed),
        (None, Some(b)) => (Endpoint::Fixed, bodies.get_mut(b).map_or(Endpoint::Fixed, Endpoint::Body)),
        (None, None) => (Endpoint::Fixed, Endpoint::Fixed),
    }
}

struct PreparedContact {
    collider1: ColliderHandle,
    collider2: ColliderHandle,
    body1: Option<RigidBodyHandle>,
    body2: Option<RigidBodyHandle>,
    constraint: ContactConstraint,
}

struct PreparedHinge {
    body1: RigidBodyHandle,
    body2: RigidBodyHandle,
    local_anchor1: Point,
    local_anchor2: Point,
    constraint: HingeConstraint,
}

struct PreparedCone {
    body1: RigidBodyHandle,
    body2: RigidBodyHandle,
    local_anchor1: Point,
    local_anchor2: Point,
    constraint: ConeConstraint,
}

struct PreparedMotor {
    body1: RigidBodyHandle,
    body2: RigidBodyHandle,
    local_anchor1: Point,
    local_anchor2: Point,
    constraint: MotorConstraint,
}

/// The simulation entry point (§6): every `add_*` method inserts a
/// collider -- and, for dynamic colliders, the rigid body that drives it
/// -- and registers it with the broad phase; [`PhysicsWorld::update`]
/// advances the whole world by one step.
pub struct PhysicsWorld {
    pub colliders: ColliderSet,
    pub bodies: RigidBodySet,
    pub joints: JointSet,
    pub rigid_body_settings: RigidBodySettings,
    pub parameters: IntegrationParameters,
    octree: Option<Octree>,
    narrow_phase: NarrowPhase,
    cache: CacheManager,
    height_field: Option<ColliderHandle>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            colliders: ColliderSet::new(),
            bodies: RigidBodySet::new(),
            joints: JointSet::new(),
            rigid_body_settings: RigidBodySettings::default(),
            parameters: IntegrationParameters::default(),
            octree: None,
            narrow_phase: NarrowPhase::new(),
            cache: CacheManager::new(),
            height_field: None,
        }
    }

    // -- world setup (§6) ---------------------------------------------

    pub fn initialise_octree(&mut self, bounds: Aabb, depth: u32) {
        self.octree = Some(Octree::new(bounds, depth));
    }

    pub fn initialise_height_field_bumpy(&mut self, parameters: BumpyTerrainParameters, material: PhysicsMaterial) -> Result<ColliderHandle, WorldError> {
        self.insert_height_field(HeightField::bumpy(parameters), material)
    }

    pub fn initialise_height_field_flat(&mut self, parameters: FlatTerrainParameters, material: PhysicsMaterial) -> Result<ColliderHandle, WorldError> {
        self.insert_height_field(HeightField::flat(parameters), material)
    }

    fn insert_height_field(&mut self, field: HeightField, material: PhysicsMaterial) -> Result<ColliderHandle, WorldError> {
        if self.height_field.is_some() {
            return Err(WorldError::HeightFieldAlreadyInitialised);
        }
        let collider = ColliderBuilder::new(Shape::HeightField(field), ColliderMotionState::Motionless).material(material).build();
        let aabb = collider.aabb;
        let handle = self.colliders.insert(collider);
        if let Some(octree) = &mut self.octree {
            octree.initialise_height_field(broad_phase::entity_id_of(handle), aabb);
        }
        self.height_field = Some(handle);
        Ok(handle)
    }

    pub fn add_sphere(&mut self, sphere: Ball, state: ColliderMotionState, material: PhysicsMaterial, offset: Isometry) -> ColliderHandle {
        let mass = material.density * sphere.volume();
        let inertia = ball_inertia(mass, &sphere);
        let shape = Shape::Convex(ConvexShape::Ball(sphere, Point::origin()));
        self.insert_convex(shape, state, material, offset, mass, inertia)
    }

    pub fn add_capsule(&mut self, capsule: Capsule, state: ColliderMotionState, material: PhysicsMaterial, offset: Isometry) -> ColliderHandle {
        let mass = material.density * capsule.volume();
        let inertia = capsule.local_inertia(mass);
        let shape = Shape::Convex(ConvexShape::Capsule(capsule));
        self.insert_convex(shape, state, material, offset, mass, inertia)
    }

    pub fn add_convex_hull(&mut self, hull: ConvexHull, state: ColliderMotionState, material: PhysicsMaterial, offset: Isometry) -> ColliderHandle {
        let mass = material.density * hull.volume();
        let inertia = box_inertia(mass, hull.aabb().half_extents());
        let shape = Shape::Convex(ConvexShape::Hull(hull));
        self.insert_convex(shape, state, material, offset, mass, inertia)
    }

    fn insert_convex(&mut self, shape: Shape, state: ColliderMotionState, material: PhysicsMaterial, offset: Isometry, mass: Real, inertia: SdpMatrix3) -> ColliderHandle {
        let collider = ColliderBuilder::new(shape, state).material(material).offset(offset).build();
        let handle = self.colliders.insert(collider);

        if state == ColliderMotionState::Dynamic {
            let body = RigidBody::new(offset, MassProperties::new(mass, inertia), handle);
            let body_handle = self.bodies.insert(body);
            if let Some(c) = self.colliders.get_mut(handle) {
                c.body = Some(body_handle);
            }
        }

        if let Some(octree) = &mut self.octree {
            broad_phase::register(octree, &mut self.colliders, handle);
        }
        handle
    }

    pub fn add_triangle_mesh(&mut self, mesh: TriangleMesh, material: PhysicsMaterial) -> ColliderHandle {
        let collider = ColliderBuilder::new(Shape::TriangleMesh(mesh), ColliderMotionState::Motionless).material(material).build();
        let handle = self.colliders.insert(collider);
        if let Some(octree) = &mut self.octree {
            broad_phase::register(octree, &mut self.colliders, handle);
        }
        handle
    }

    /// Builds one rigid body driving any number of convex components
    /// (§6 "Compound: any number of convex components sharing one
    /// rigid body"), each its own narrow-phase-visible collider but
    /// mutually non-colliding (§9 "disabled_collisions").
    #[allow(clippy::too_many_arguments)]
    pub fn add_compound(
        &mut self,
        hulls: Vec<(ConvexHull, Isometry)>,
        spheres: Vec<(Ball, Isometry)>,
        capsules: Vec<(Capsule, Isometry)>,
        state: ColliderMotionState,
        material: PhysicsMaterial,
        offset: Isometry,
    ) -> ColliderHandle {
        let compound_collider = ColliderBuilder::new(Shape::Compound(Vec::new()), state).material(material).offset(offset).build();
        let compound_handle = self.colliders.insert(compound_collider);

        let body_handle = if state == ColliderMotionState::Dynamic {
            Some(self.bodies.insert(RigidBody::new(offset, MassProperties::default(), compound_handle)))
        } else {
            None
        };

        let mut components = Vec::new();
        let mut mass = 0.0;
        let mut inertia = SdpMatrix3::zero();
        let mut bound = Aabb::invalid();

        for (hull, local) in hulls {
            let m = material.density * hull.volume();
            let own = box_inertia(m, hull.aabb().half_extents());
            let shifted = own.add(&SdpMatrix3::from_sdp_matrix(crate::utils::parallel_axis_shift(m, local.translation.vector)));
            let (h, aabb) = self.insert_component(Shape::Convex(ConvexShape::Hull(hull)), state, material, offset * local, body_handle);
            mass += m;
            inertia = inertia.add(&shifted);
            bound.merge(&aabb);
            components.push(h);
        }
        for (sphere, local) in spheres {
            let m = material.density * sphere.volume();
            let own = ball_inertia(m, &sphere);
            let shifted = own.add(&SdpMatrix3::from_sdp_matrix(crate::utils::parallel_axis_shift(m, local.translation.vector)));
            let (h, aabb) = self.insert_component(Shape::Convex(ConvexShape::Ball(sphere, Point::origin())), state, material, offset * local, body_handle);
            mass += m;
            inertia = inertia.add(&shifted);
            bound.merge(&aabb);
            components.push(h);
        }
        for (capsule, local) in capsules {
            let m = material.density * capsule.volume();
            let own = capsule.local_inertia(m);
            let shifted = own.add(&SdpMatrix3::from_sdp_matrix(crate::utils::parallel_axis_shift(m, local.translation.vector)));
            let (h, aabb) = self.insert_component(Shape::Convex(ConvexShape::Capsule(capsule)), state, material, offset * local, body_handle);
            mass += m;
            inertia = inertia.add(&shifted);
            bound.merge(&aabb);
            components.push(h);
        }

        if let Some(c) = self.colliders.get_mut(compound_handle) {
            c.shape = Shape::Compound(components.clone());
            c.aabb = bound;
            c.body = body_handle;
        }

        if let Some(body_handle) = body_handle {
            let mut disabled = components.clone();
            disabled.push(compound_handle);
            if let Some(body) = self.bodies.get_mut(body_handle) {
                body.mass_properties = MassProperties::new(mass, inertia);
                body.disabled_collisions = disabled;
            }
        }

        if let Some(octree) = &mut self.octree {
            broad_phase::register(octree, &mut self.colliders, compound_handle);
        }

        compound_handle
    }

    fn insert_component(&mut self, shape: Shape, state: ColliderMotionState, material: PhysicsMaterial, pose: Isometry, body: Option<RigidBodyHandle>) -> (ColliderHandle, Aabb) {
        let collider = ColliderBuilder::new(shape, state).material(material).offset(pose).build();
        let aabb = collider.aabb;
        let handle = self.colliders.insert(collider);
        if let Some(c) = self.colliders.get_mut(handle) {
            c.body = body;
        }
        if let Some(octree) = &mut self.octree {
            broad_phase::register(octree, &mut self.colliders, handle);
        }
        (handle, aabb)
    }

    pub fn add_hinge_joint(&mut self, body1: RigidBodyHandle, body2: RigidBodyHandle, hinge: Hinge) -> JointHandle {
        self.joints.insert(body1, body2, JointKind::Hinge(hinge))
    }

    pub fn add_cone_joint(&mut self, body1: RigidBodyHandle, body2: RigidBodyHandle, cone: Cone) -> JointHandle {
        self.joints.insert(body1, body2, JointKind::Cone(cone))
    }

    pub fn add_motor_joint(&mut self, body1: RigidBodyHandle, body2: RigidBodyHandle, motor: Motor) -> JointHandle {
        self.joints.insert(body1, body2, JointKind::Motor(motor))
    }

    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        if let Some(octree) = &mut self.octree {
            broad_phase::unregister(octree, &self.colliders, handle);
        }
        if let Some(collider) = self.colliders.remove(handle) {
            // Stale hull/impulse cache entries for pairs involving `handle`
            // are harmless: neither side of those keys is ever proposed by
            // the broad phase again, and `CacheManager::age` reclaims them.
            if let Some(body) = collider.body {
                self.bodies.remove(body);
            }
        }
    }

    // -- simulation (§4.7, §4.8, §4.9, §5) -----------------------------

    pub fn update(&mut self, dt: Real) {
        self.parameters.dt = dt;
        self.step();
    }

    fn step(&mut self) {
        let moved = self.integrate_bodies();
        let ccd_active = self.run_ccd(&moved);
        self.relocate_moved(&moved, &ccd_active);
        let manifolds = self.generate_manifolds();
        self.wake_islands(&manifolds);
        self.solve(&manifolds);
        self.cache.age();
    }

    /// Groups every body sharing a contact or joint this step into an
    /// island and wakes the whole island if any one member is active
    /// (§4.9 "island wake-up"), so a sleeping body touched by a moving
    /// one starts integrating again next step rather than lagging a
    /// frame behind.
    fn wake_islands(&mut self, manifolds: &[GeneratedManifold]) {
        let mut builder = IslandBuilder::new();
        for gm in manifolds {
            let b1 = self.colliders.get(gm.collider1).and_then(|c| c.body);
            let b2 = self.colliders.get(gm.collider2).and_then(|c| c.body);
            if let (Some(a), Some(b)) = (b1, b2) {
                builder.union(a, b);
            }
        }
        for (_, joint) in self.joints.iter() {
            builder.union(joint.body1, joint.body2);
        }

        let handles: Vec<RigidBodyHandle> = self.bodies.iter().map(|(h, _)| h).collect();
        let islands = builder.finish(handles.iter().copied());

        let mut active_islands: FxHashSet<u32> = FxHashSet::default();
        for &h in &handles {
            if let (Some(&island), Some(body)) = (islands.get(&h), self.bodies.get(h)) {
                if body.is_active() {
                    active_islands.insert(island);
                }
            }
        }

        let least_motion = self.rigid_body_settings.least_motion;
        for &h in &handles {
            if let Some(&island) = islands.get(&h) {
                if active_islands.contains(&island) {
                    if let Some(body) = self.bodies.get_mut(h) {
                        if !body.is_active() {
                            body.activate(least_motion);
                        }
                    }
                }
            }
        }
    }

    /// Semi-implicit Euler integration of every active dynamic body
    /// (§4.8), propagating each body's relative transform onto the
    /// collider(s) it drives. Bodies that fall asleep this step are
    /// skipped entirely -- their geometry did not move.
    fn integrate_bodies(&mut self) -> Vec<(RigidBodyHandle, Isometry)> {
        let mut moved = Vec::new();
        let handles: Vec<RigidBodyHandle> = self.bodies.iter().map(|(h, _)| h).collect();
        for handle in handles {
            let Some(body) = self.bodies.get_mut(handle) else { continue };
            if !body.is_active() {
                continue;
            }
            let Some(relative) = body.integrate(&self.rigid_body_settings, self.parameters.dt) else { continue };
            let owned = body.disabled_collisions.clone();
            for ch in owned {
                if let Some(collider) = self.colliders.get_mut(ch) {
                    collider.apply_relative_transform(&relative);
                }
            }
            moved.push((handle, relative));
        }
        moved
    }

    /// Sweeps every body whose motion this step exceeds the CCD trigger
    /// ratio against the broad phase for an earlier time of impact, and
    /// clamps it there (§4.6, §4.7). Only single, convex, dynamic
    /// colliders run CCD: compounds and the non-convex kinds never do in
    /// the source either.
    fn run_ccd(&mut self, moved: &[(RigidBodyHandle, Isometry)]) -> FxHashSet<RigidBodyHandle> {
        let mut ccd_active = FxHashSet::default();
        let Some(octree) = self.octree.take() else { return ccd_active };

        for &(body_handle, relative) in moved {
            let Some(body) = self.bodies.get(body_handle) else { continue };
            let Some(collider) = self.colliders.get(body.collider) else { continue };
            let Shape::Convex(shape) = collider.shape.clone() else { continue };

            let radius = shape.bounding_radius();
            if radius <= 0.0 {
                continue;
            }
            let ratio = relative.translation.vector.norm_squared() / (radius * radius);
            if ratio <= self.parameters.ccd_trigger_ratio {
                continue;
            }

            let start_pose = body.prev_transform;
            let end_pose = body.transform;
            let swept = shape.transform_by(&start_pose).aabb().merged(&shape.transform_by(&end_pose).aabb());

            let mut earliest: Option<Real> = None;
            for entity in octree.query(swept) {
                let other_handle = broad_phase::handle_of(entity);
                if other_handle == body.collider {
                    continue;
                }
                let Some(other) = self.colliders.get(other_handle) else { continue };
                let Shape::Convex(other_shape) = &other.shape else { continue };

                let status = crate::geometry::time_of_impact(&shape, start_pose, end_pose, other_shape, other.position, other.position, self.parameters.ccd_tolerance);
                if let ToiStatus::Touching { toi, .. } = status {
                    earliest = Some(earliest.map_or(toi, |e: Real| e.min(toi)));
                }
            }

            if let Some(toi) = earliest {
                if let Some(body) = self.bodies.get_mut(body_handle) {
                    let delta = body.sub_step(toi);
                    let owned = body.disabled_collisions.clone();
                    for ch in owned {
                        if let Some(c) = self.colliders.get_mut(ch) {
                            c.apply_relative_transform(&delta);
                        }
                    }
                }
                ccd_active.insert(body_handle);
            }
        }

        self.octree = Some(octree);
        ccd_active
    }

    /// Re-homes every moved collider in the broad phase (§4.3), choosing
    /// the continuous update for bodies CCD just clamped.
    fn relocate_moved(&mut self, moved: &[(RigidBodyHandle, Isometry)], ccd_active: &FxHashSet<RigidBodyHandle>) {
        let Some(mut octree) = self.octree.take() else { return };
        for &(body_handle, _) in moved {
            let Some(body) = self.bodies.get(body_handle) else { continue };
            let continuous = ccd_active.contains(&body_handle);
            let owned = body.disabled_collisions.clone();
            for ch in owned {
                broad_phase::relocate(&mut octree, &mut self.colliders, ch, continuous);
            }
        }
        self.octree = Some(octree);
    }

    /// Queries the broad phase for every overlapping, relevant pair and
    /// runs the narrow phase on each exactly once (§4.3, §4.5).
    fn generate_manifolds(&mut self) -> Vec<GeneratedManifold> {
        let Some(octree) = self.octree.take() else { return Vec::new() };
        let mut swept: FxHashSet<ColliderHandle> = FxHashSet::default();
        let mut seen_pairs: FxHashSet<u64> = FxHashSet::default();
        let mut manifolds = Vec::new();

        let handles: Vec<ColliderHandle> = self.colliders.iter().map(|(h, _)| h).collect();
        for handle in handles {
            let disabled = self
                .colliders
                .get(handle)
                .and_then(|c| c.body)
                .and_then(|b| self.bodies.get(b))
                .map(|b| b.disabled_collisions.clone())
                .unwrap_or_default();

            for other in broad_phase::candidates_for(&octree, &self.colliders, handle, &swept) {
                if !broad_phase::pair_is_relevant(&self.colliders, handle, other, &disabled) {
                    continue;
                }
                let key = crate::geometry::pair_key(broad_phase::entity_id_of(handle), broad_phase::entity_id_of(other));
                if !seen_pairs.insert(key) {
                    continue;
                }
                manifolds.extend(
                    self.narrow_phase
                        .generate(&self.colliders, handle, other)
                        .into_iter()
                        .filter(|m| m.manifold.is_penetrating()),
                );
            }
            swept.insert(handle);
        }

        self.octree = Some(octree);
        manifolds
    }

    /// One full sequential-impulse solve (§4.9): prepare every contact
    /// and joint constraint, warm-start, run the velocity iterations,
    /// then the position iterations, and finally store this step's
    /// impulses in the cache for next step's warm start (§4.10).
    fn solve(&mut self, manifolds: &[GeneratedManifold]) {
        let mut contacts = Vec::with_capacity(manifolds.len());
        for gm in manifolds {
            let body1 = self.colliders.get(gm.collider1).and_then(|c| c.body);
            let body2 = self.colliders.get(gm.collider2).and_then(|c| c.body);
            if body1.is_none() && body2.is_none() {
                continue;
            }
            let cache = self.cache.lookup(gm.collider1, gm.collider2);
            let b1 = body1.and_then(|h| self.bodies.get(h));
            let b2 = body2.and_then(|h| self.bodies.get(h));
            let constraint = ContactConstraint::new(&gm.manifold, b1, b2, &self.parameters.contact_solver, &cache);
            contacts.push(PreparedContact { collider1: gm.collider1, collider2: gm.collider2, body1, body2, constraint });
        }

        let baumgarte = self.parameters.contact_solver.baumgarte_factor;
        let linear_slop = self.parameters.contact_solver.linear_slop;
        let dt = self.parameters.dt;

        let mut hinges = Vec::new();
        let mut cones = Vec::new();
        let mut motors = Vec::new();
        for (_, joint) in self.joints.iter() {
            let (Some(b1), Some(b2)) = (self.bodies.get(joint.body1), self.bodies.get(joint.body2)) else { continue };
            match &joint.kind {
                JointKind::Hinge(h) => hinges.push(PreparedHinge {
                    body1: joint.body1,
                    body2: joint.body2,
                    local_anchor1: h.local_anchor1,
                    local_anchor2: h.local_anchor2,
                    constraint: h.prepare(b1, b2, baumgarte),
                }),
                JointKind::Cone(c) => cones.push(PreparedCone {
                    body1: joint.body1,
                    body2: joint.body2,
                    local_anchor1: c.local_anchor1,
                    local_anchor2: c.local_anchor2,
                    constraint: c.prepare(b1, b2, baumgarte),
                }),
                JointKind::Motor(m) => motors.push(PreparedMotor {
                    body1: joint.body1,
                    body2: joint.body2,
                    local_anchor1: m.hinge.local_anchor1,
                    local_anchor2: m.hinge.local_anchor2,
                    constraint: m.prepare(b1, b2, baumgarte, dt),
                }),
            }
        }

        for pc in &contacts {
            let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, pc.body1, pc.body2);
            pc.constraint.warm_start(&mut e1, &mut e2);
        }
        for ph in &hinges {
            let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(ph.body1), Some(ph.body2));
            ph.constraint.warm_start(&mut e1, &mut e2);
        }
        for pc in &cones {
            let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(pc.body1), Some(pc.body2));
            pc.constraint.warm_start(&mut e1, &mut e2);
        }
        for pm in &motors {
            let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(pm.body1), Some(pm.body2));
            pm.constraint.warm_start(&mut e1, &mut e2);
        }

        for _ in 0..self.parameters.velocity_iterations {
            for pc in &mut contacts {
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, pc.body1, pc.body2);
                pc.constraint.solve_velocity(&mut e1, &mut e2);
            }
            for ph in &mut hinges {
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(ph.body1), Some(ph.body2));
                ph.constraint.solve_velocity(&mut e1, &mut e2);
            }
            for pc in &mut cones {
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(pc.body1), Some(pc.body2));
                pc.constraint.solve_velocity(&mut e1, &mut e2);
            }
            for pm in &mut motors {
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(pm.body1), Some(pm.body2));
                pm.constraint.solve_velocity(&mut e1, &mut e2);
            }
        }

        for _ in 0..self.parameters.position_iterations {
            for pc in &contacts {
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, pc.body1, pc.body2);
                pc.constraint.solve_position(&mut e1, &mut e2, baumgarte, linear_slop);
            }
            for ph in &hinges {
                let error = self.anchor_error(ph.body1, ph.body2, ph.local_anchor1, ph.local_anchor2);
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(ph.body1), Some(ph.body2));
                ph.constraint.solve_position(&mut e1, &mut e2, baumgarte, error);
            }
            for pc in &cones {
                let error = self.anchor_error(pc.body1, pc.body2, pc.local_anchor1, pc.local_anchor2);
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(pc.body1), Some(pc.body2));
                pc.constraint.solve_position(&mut e1, &mut e2, baumgarte, error);
            }
            for pm in &motors {
                let error = self.anchor_error(pm.body1, pm.body2, pm.local_anchor1, pm.local_anchor2);
                let (mut e1, mut e2) = endpoints_mut(&mut self.bodies, Some(pm.body1), Some(pm.body2));
                pm.constraint.solve_position(&mut e1, &mut e2, baumgarte, error);
            }
        }

        for pc in &contacts {
            self.cache.store(pc.collider1, pc.collider2, &pc.constraint, self.parameters.frames_to_retain_cache);
        }
    }

    fn anchor_error(&self, body1: RigidBodyHandle, body2: RigidBodyHandle, local_anchor1: Point, local_anchor2: Point) -> crate::math::Vector {
        let (Some(b1), Some(b2)) = (self.bodies.get(body1), self.bodies.get(body2)) else {
            return crate::math::Vector::zeros();
        };
        (b2.transform * local_anchor2) - (b1.transform * local_anchor1)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Vector;

    fn settled_world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.initialise_octree(Aabb::new(Point::new(-100.0, -100.0, -100.0), Point::new(100.0, 100.0, 100.0)), 4);
        world.rigid_body_settings.gravity = Vector::new(0.0, -9.81, 0.0);
        world
    }

    #[test]
    fn a_sphere_dropped_onto_a_flat_field_falls_asleep() {
        let mut world = settled_world();
        world
            .initialise_height_field_flat(FlatTerrainParameters { height: 0.0, half_extent: 50.0 }, PhysicsMaterial::default())
            .unwrap();
        let handle = world.add_sphere(Ball::new(0.5), ColliderMotionState::Dynamic, PhysicsMaterial::default(), Isometry::translation(0.0, 5.0, 0.0));

        for _ in 0..600 {
            world.update(1.0 / 60.0);
        }

        let body = world.colliders.get(handle).unwrap().body.unwrap();
        assert!(!world.bodies.get(body).unwrap().is_active());
    }

    #[test]
    fn two_dynamic_spheres_settle_without_sinking_through_each_other() {
        let mut world = settled_world();
        world
            .initialise_height_field_flat(FlatTerrainParameters { height: 0.0, half_extent: 50.0 }, PhysicsMaterial::default())
            .unwrap();
        let top = world.add_sphere(Ball::new(0.5), ColliderMotionState::Dynamic, PhysicsMaterial::default(), Isometry::translation(0.0, 3.0, 0.0));
        let bottom = world.add_sphere(Ball::new(0.5), ColliderMotionState::Dynamic, PhysicsMaterial::default(), Isometry::translation(0.0, 1.0, 0.0));

        for _ in 0..300 {
            world.update(1.0 / 60.0);
        }

        let top_y = world.colliders.get(top).unwrap().position.translation.vector.y;
        let bottom_y = world.colliders.get(bottom).unwrap().position.translation.vector.y;
        assert!(top_y > bottom_y);
    }

    #[test]
    fn a_motionless_collider_never_gets_a_rigid_body() {
        let mut world = settled_world();
        let handle = world.add_sphere(Ball::new(1.0), ColliderMotionState::Motionless, PhysicsMaterial::default(), Isometry::identity());
        assert!(world.colliders.get(handle).unwrap().body.is_none());
    }
}
