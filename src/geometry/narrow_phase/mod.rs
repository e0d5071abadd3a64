//! Dispatch table over ordered shape-kind pairs (§4.5), plus the
//! persistent hull-vs-hull contact cache it threads through.
//!
//! Composition over inheritance: rather than a table of function
//! pointers indexed by `(kind1, kind2)` the source uses, dispatch here is
//! a `match` on a tagged [`Shape`] pair (§9 design notes). Compound
//! colliders are expanded into their components before any pair routine
//! ever sees them.

mod capsule_capsule;
mod capsule_hull;
mod capsule_trimesh;
mod hull_hull;
mod hull_trimesh;
mod sphere_capsule;
mod sphere_hull;
mod sphere_sphere;
mod sphere_trimesh;

pub use hull_hull::HullContactCache;

use crate::geometry::collider::{ColliderHandle, ColliderSet, PhysicsMaterial};
use crate::geometry::contact::ContactManifold;
use crate::geometry::heightfield::HeightField;
use crate::geometry::shape::{ConvexShape, Shape};
use crate::geometry::triangle::Triangle;
use crate::geometry::trimesh::TriangleMesh;
use crate::math::{Isometry, Point, Real};
use rustc_hash::FxHashMap;

/// One generated manifold together with the two (leaf, non-compound)
/// colliders it belongs to -- for a compound pair this is the component
/// collider, not the compound's own handle.
pub struct GeneratedManifold {
    pub collider1: ColliderHandle,
    pub collider2: ColliderHandle,
    pub manifold: ContactManifold,
}

/// Owns the persistent hull-vs-hull contact caches (§4.5), keyed by the
/// unordered pair of collider handles. Everything else the narrow phase
/// needs is either stateless or already owned by the colliders
/// themselves.
#[derive(Default)]
pub struct NarrowPhase {
    hull_cache: FxHashMap<(ColliderHandle, ColliderHandle), HullContactCache>,
}

impl NarrowPhase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cache entry for a pair, e.g. when one side leaves the
    /// world.
    pub fn forget_pair(&mut self, a: ColliderHandle, b: ColliderHandle) {
        self.hull_cache.remove(&cache_key(a, b));
    }

    /// Generates every manifold for the (possibly compound-expanded) pair
    /// `(a, b)`. Each returned [`GeneratedManifold`] names the actual leaf
    /// colliders involved so the solver can look up their rigid bodies.
    pub fn generate(&mut self, colliders: &ColliderSet, a: ColliderHandle, b: ColliderHandle) -> Vec<GeneratedManifold> {
        let (Some(collider_a), Some(collider_b)) = (colliders.get(a), colliders.get(b)) else {
            return Vec::new();
        };

        if let Shape::Compound(components) = &collider_a.shape {
            return components.iter().flat_map(|&c| self.generate(colliders, c, b)).collect();
        }
        if let Shape::Compound(components) = &collider_b.shape {
            return components.iter().flat_map(|&c| self.generate(colliders, a, c)).collect();
        }

        match (&collider_a.shape, &collider_b.shape) {
            (Shape::Convex(ca), Shape::Convex(cb)) => self
                .convex_pair(a, ca, collider_a.material, b, cb, collider_b.material)
                .map(|m| vec![GeneratedManifold { collider1: a, collider2: b, manifold: m }])
                .unwrap_or_default(),
            (Shape::Convex(ca), Shape::TriangleMesh(mesh)) => {
                convex_vs_mesh(ca, collider_a.material, mesh, &collider_b.position, collider_b.material)
                    .map(|m| vec![GeneratedManifold { collider1: a, collider2: b, manifold: m }])
                    .unwrap_or_default()
            }
            (Shape::TriangleMesh(mesh), Shape::Convex(ca)) => {
                convex_vs_mesh(ca, collider_b.material, mesh, &collider_a.position, collider_a.material)
                    .map(|m| vec![GeneratedManifold { collider1: a, collider2: b, manifold: flip(m) }])
                    .unwrap_or_default()
            }
            (Shape::Convex(ca), Shape::HeightField(hf)) => {
                convex_vs_heightfield(ca, collider_a.material, hf, collider_b.material)
                    .map(|m| vec![GeneratedManifold { collider1: a, collider2: b, manifold: m }])
                    .unwrap_or_default()
            }
            (Shape::HeightField(hf), Shape::Convex(ca)) => {
                convex_vs_heightfield(ca, collider_b.material, hf, collider_a.material)
                    .map(|m| vec![GeneratedManifold { collider1: a, collider2: b, manifold: flip(m) }])
                    .unwrap_or_default()
            }
            // Mesh-mesh, heightfield-heightfield and mesh-heightfield pairs
            // never occur: both kinds are always motionless (§6), so the
            // broad phase never proposes them as a colliding pair.
            _ => Vec::new(),
        }
    }

    fn convex_pair(
        &mut self,
        handle1: ColliderHandle,
        c1: &ConvexShape,
        mat1: PhysicsMaterial,
        handle2: ColliderHandle,
        c2: &ConvexShape,
        mat2: PhysicsMaterial,
    ) -> Option<ContactManifold> {
        use ConvexShape::*;
        match (c1, c2) {
            (Ball(b1, p1), Ball(b2, p2)) => sphere_sphere::generate(*p1, b1.radius, *p2, b2.radius, mat1, mat2),
            (Ball(b1, p1), Capsule(cap2)) => sphere_capsule::generate(*p1, b1.radius, cap2, mat1, mat2),
            (Capsule(cap1), Ball(b2, p2)) => sphere_capsule::generate(*p2, b2.radius, cap1, mat2, mat1).map(flip),
            (Ball(b1, p1), Hull(h2)) => sphere_hull::generate(*p1, b1.radius, h2, mat1, mat2),
            (Hull(h1), Ball(b2, p2)) => sphere_hull::generate(*p2, b2.radius, h1, mat2, mat1).map(flip),
            (Capsule(cap1), Capsule(cap2)) => capsule_capsule::generate(cap1, cap2, mat1, mat2),
            (Capsule(cap1), Hull(h2)) => capsule_hull::generate(cap1, h2, mat1, mat2),
            (Hull(h1), Capsule(cap2)) => capsule_hull::generate(cap2, h1, mat2, mat1).map(flip),
            (Hull(h1), Hull(h2)) => {
                let cache = self.hull_cache.entry(cache_key(handle1, handle2)).or_default();
                hull_hull::generate(h1, h2, mat1, mat2, cache)
            }
        }
    }
}

fn cache_key(a: ColliderHandle, b: ColliderHandle) -> (ColliderHandle, ColliderHandle) {
    use slotmap::Key;
    if a.data().as_ffi() <= b.data().as_ffi() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Swaps a manifold's two sides, used whenever the dispatcher had to call
/// a routine with its arguments reversed relative to the caller's
/// `(a, b)` order, to preserve the "normal points from collider1 toward
/// collider2" convention for the original order.
fn flip(mut m: ContactManifold) -> ContactManifold {
    std::mem::swap(&mut m.material1, &mut m.material2);
    for p in m.points.iter_mut() {
        std::mem::swap(&mut p.position1, &mut p.position2);
        p.normal = -p.normal;
        std::mem::swap(&mut p.id.feature_a, &mut p.id.feature_b);
    }
    m
}

fn convex_vs_mesh(
    shape: &ConvexShape,
    mat1: PhysicsMaterial,
    mesh: &TriangleMesh,
    mesh_pose: &Isometry,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    match shape {
        ConvexShape::Ball(b, p) => sphere_trimesh::generate(*p, b.radius, mesh, mesh_pose, mat1, mat2),
        ConvexShape::Capsule(cap) => capsule_trimesh::generate(cap, mesh, mesh_pose, mat1, mat2),
        ConvexShape::Hull(h) => hull_trimesh::generate(h, mesh, mesh_pose, mat1, mat2),
    }
}

/// Height fields carry no pose of their own (one per world, placed at
/// initialisation): their triangles are produced already in world space.
fn convex_vs_heightfield(
    shape: &ConvexShape,
    mat1: PhysicsMaterial,
    hf: &HeightField,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let aabb = shape.aabb();
    let triangles = hf.triangles_overlapped(&aabb);
    if triangles.is_empty() {
        return None;
    }
    match shape {
        ConvexShape::Ball(b, p) => sphere_vs_triangles(*p, b.radius, &triangles, mat1, mat2),
        ConvexShape::Capsule(cap) => capsule_vs_triangles(cap, &triangles, mat1, mat2),
        ConvexShape::Hull(h) => hull_vs_triangles(h, &triangles, mat1, mat2),
    }
}

/// The triangle's face normal, oriented to point *away* from the convex
/// body's reference point -- i.e. from collider1 (the convex shape) into
/// collider2 (the mesh), matching this crate's "normal points from
/// collider1 toward collider2" convention (`contact.rs`) rather than the
/// triangle's own arbitrary winding.
fn oriented_normal(tri: &Triangle, convex_reference: Point) -> crate::math::Vector {
    let raw = tri.normal();
    if raw.dot(&(convex_reference - tri.a)) < 0.0 {
        raw
    } else {
        -raw
    }
}

fn sphere_vs_triangles(
    center: Point,
    radius: Real,
    triangles: &[Triangle],
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    use crate::geometry::contact::{ContactId, ContactPoint};
    let mut manifold = ContactManifold::new(mat1, mat2);
    for (ti, tri) in triangles.iter().enumerate() {
        let closest = tri.closest_point(center);
        let dist_sq = (center - closest).norm_squared();
        if dist_sq >= radius * radius {
            continue;
        }
        let dist = dist_sq.sqrt();
        let normal = oriented_normal(tri, center);
        manifold.push(ContactPoint {
            position1: center + normal * radius,
            position2: closest,
            normal,
            penetration: dist - radius,
            id: ContactId { feature_a: 0, feature_b: ti as u32 },
        });
        if manifold.points.len() >= 4 {
            break;
        }
    }
    if manifold.points.is_empty() {
        None
    } else {
        Some(manifold)
    }
}

fn capsule_vs_triangles(
    capsule: &crate::geometry::capsule::Capsule,
    triangles: &[Triangle],
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    use crate::geometry::contact::{ContactId, ContactPoint};
    let (a, b) = capsule.segment();
    let mut manifold = ContactManifold::new(mat1, mat2);
    for (ti, tri) in triangles.iter().enumerate() {
        for endpoint in [a, b] {
            let closest = tri.closest_point(endpoint);
            let dist_sq = (endpoint - closest).norm_squared();
            if dist_sq >= capsule.radius * capsule.radius {
                continue;
            }
            let dist = dist_sq.sqrt();
            let normal = oriented_normal(tri, endpoint);
            manifold.push(ContactPoint {
                position1: endpoint + normal * capsule.radius,
                position2: closest,
                normal,
                penetration: dist - capsule.radius,
                id: ContactId { feature_a: 0, feature_b: ti as u32 },
            });
            if manifold.points.len() >= 4 {
                break;
            }
        }
    }
    if manifold.points.is_empty() {
        None
    } else {
        Some(manifold)
    }
}

fn hull_vs_triangles(
    hull: &crate::geometry::convex_hull::ConvexHull,
    triangles: &[Triangle],
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    use crate::geometry::contact::{ContactId, ContactPoint};
    let centroid = hull.aabb().center();
    let mut manifold = ContactManifold::new(mat1, mat2);
    'triangles: for (ti, tri) in triangles.iter().enumerate() {
        let normal = oriented_normal(tri, centroid);
        for (vi, vertex) in hull.vertices().iter().enumerate() {
            // `normal` points from the hull into the mesh, so a vertex
            // that has crossed to the far side of the triangle plane (and
            // is therefore penetrating) has a *positive* dot here.
            let crossing = normal.dot(&(*vertex - tri.a));
            if crossing <= 0.0 {
                continue;
            }
            let projected = *vertex - normal * crossing;
            if !tri.contains_projected(projected) {
                continue;
            }
            manifold.push(ContactPoint {
                position1: *vertex,
                position2: projected,
                normal,
                penetration: -crossing,
                id: ContactId { feature_a: vi as u32, feature_b: ti as u32 },
            });
            if manifold.points.len() >= 4 {
                break 'triangles;
            }
        }
    }
    if manifold.points.is_empty() {
        None
    } else {
        Some(manifold)
    }
}
