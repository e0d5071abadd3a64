use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{enforce_four_contacts, ContactId, ContactManifold, ContactPoint};
use crate::geometry::convex_hull::ConvexHull;
use crate::math::{Point, Real, Vector};

/// How far the cumulative squared centroid separation may drift before a
/// cached face pair is considered stale and a full SAT re-derivation runs
/// (mirrors `minimalDisplacement` from the reference engine's settings).
const MINIMAL_DISPLACEMENT: Real = 0.015;
const SEPARATION_EPSILON: Real = 1.0e-5;

/// Per-pair cache: the last winning axis (face pair, or "not a face") plus
/// the centroids at the time it was computed, used to skip a full SAT
/// re-derivation when the pair has barely moved (§4.5).
#[derive(Clone, Debug)]
pub struct HullContactCache {
    is_face_axis: bool,
    ref_is_a: bool,
    ref_face: u32,
    incident_face: u32,
    centroid_a: Point,
    centroid_b: Point,
}

impl Default for HullContactCache {
    fn default() -> Self {
        Self {
            is_face_axis: false,
            ref_is_a: true,
            ref_face: 0,
            incident_face: 0,
            centroid_a: Point::origin(),
            centroid_b: Point::origin(),
        }
    }
}

/// Hull-hull (§4.5). Cache-driven: reuse the last reference/incident face
/// pair if it was a face axis and the centroids have barely moved; else
/// run the full SAT derivation (face query on both hulls, then an edge
/// query), and cache whatever won.
pub fn generate(
    hull_a: &ConvexHull,
    hull_b: &ConvexHull,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
    cache: &mut HullContactCache,
) -> Option<ContactManifold> {
    let centroid_a = centroid(hull_a);
    let centroid_b = centroid(hull_b);

    let drift = ((centroid_a - centroid_b).norm_squared()
        - (cache.centroid_a - cache.centroid_b).norm_squared())
    .abs();

    if cache.is_face_axis && drift < MINIMAL_DISPLACEMENT {
        let (ref_hull, incident_hull, ref_is_a) = if cache.ref_is_a {
            (hull_a, hull_b, true)
        } else {
            (hull_b, hull_a, false)
        };
        let manifold = generate_face_contacts(
            ref_hull,
            incident_hull,
            cache.ref_face,
            cache.incident_face,
            mat1,
            mat2,
            ref_is_a,
        );
        if manifold.is_some() {
            return manifold;
        }
        // Stale cache produced nothing: fall through to a fresh derivation.
    }

    cache.centroid_a = centroid_a;
    cache.centroid_b = centroid_b;
    cache.is_face_axis = false;

    let faces = match closest_faces(hull_a, hull_b) {
        Some(f) => f,
        None => return None, // a face axis separates them
    };
    let edges = match closest_edges(hull_a, hull_b, centroid_a) {
        Some(e) => e,
        None => return None, // an edge axis separates them
    };

    if faces.penetration <= edges.penetration {
        let (ref_hull, incident_hull) = if faces.ref_is_a { (hull_a, hull_b) } else { (hull_b, hull_a) };
        let manifold = generate_face_contacts(
            ref_hull,
            incident_hull,
            faces.ref_face,
            faces.incident_face,
            mat1,
            mat2,
            faces.ref_is_a,
        );
        if manifold.is_some() {
            cache.is_face_axis = true;
            cache.ref_is_a = faces.ref_is_a;
            cache.ref_face = faces.ref_face;
            cache.incident_face = faces.incident_face;
        }
        manifold
    } else {
        Some(generate_edge_contact(hull_a, hull_b, &edges, mat1, mat2))
    }
}

fn centroid(hull: &ConvexHull) -> Point {
    let verts = hull.vertices();
    let sum: Vector = verts.iter().map(|p| p.coords).sum();
    (sum / verts.len() as Real).into()
}

struct ClosestFaces {
    ref_is_a: bool,
    ref_face: u32,
    incident_face: u32,
    penetration: Real,
}

/// Scans both hulls' faces as candidate reference planes (§4.5: "find the
/// hull-A face minimising ...; similarly for hull-B; face wins"). Returns
/// `None` the moment any face's plane separates the pair outright.
fn closest_faces(hull_a: &ConvexHull, hull_b: &ConvexHull) -> Option<ClosestFaces> {
    let best_a = best_face_penetration(hull_a, hull_b)?;
    let best_b = best_face_penetration(hull_b, hull_a)?;

    let (ref_is_a, ref_face, penetration, ref_hull, other_hull) = if best_a.1 <= best_b.1 {
        (true, best_a.0, best_a.1, hull_a, hull_b)
    } else {
        (false, best_b.0, best_b.1, hull_b, hull_a)
    };

    let ref_plane = &ref_hull.mesh.faces[ref_face as usize];
    let mut incident_face = 0u32;
    let mut least = Real::MAX;
    for (j, face) in other_hull.mesh.faces.iter().enumerate() {
        if face.distance.is_nan() {
            continue;
        }
        let verts = other_hull.mesh.face_vertices(j as u32);
        let support = verts
            .iter()
            .copied()
            .max_by(|a, b| {
                (-ref_plane.normal)
                    .dot(&a.coords)
                    .partial_cmp(&(-ref_plane.normal).dot(&b.coords))
                    .unwrap()
            })
            .unwrap();
        let score = face.normal.dot(&ref_plane.normal) + ref_plane.plane_distance(support);
        if score < least {
            least = score;
            incident_face = j as u32;
        }
    }

    Some(ClosestFaces {
        ref_is_a,
        ref_face,
        incident_face,
        penetration,
    })
}

/// Best (least-penetrating) face of `hull` as a reference candidate
/// against `other`; `None` if any face already separates them.
fn best_face_penetration(hull: &ConvexHull, other: &ConvexHull) -> Option<(u32, Real)> {
    let mut best_face = 0u32;
    let mut best_penetration = Real::MAX;
    for (i, face) in hull.mesh.faces.iter().enumerate() {
        if face.distance.is_nan() {
            continue;
        }
        let support = other.support_point(-face.normal);
        let d = -face.plane_distance(support);
        if d < SEPARATION_EPSILON {
            return None;
        }
        if d < best_penetration {
            best_penetration = d;
            best_face = i as u32;
        }
    }
    Some((best_face, best_penetration))
}

struct ClosestEdges {
    normal: Vector,
    penetration: Real,
    edge_a: u32,
    edge_b: u32,
}

fn closest_edges(hull_a: &ConvexHull, hull_b: &ConvexHull, center_a: Point) -> Option<ClosestEdges> {
    let mut best: Option<ClosestEdges> = None;

    for (ea_idx, ea_twin) in hull_a.mesh.undirected_edges() {
        let ea = &hull_a.mesh.half_edges[ea_idx as usize];
        let ea_t = &hull_a.mesh.half_edges[ea_twin as usize];
        let pa = hull_a.mesh.vertices[ea.origin as usize];
        let qa = hull_a.mesh.vertices[ea_t.origin as usize];
        let dir_a = qa - pa;
        let n1 = hull_a.mesh.faces[ea.face as usize].normal;
        let n2 = hull_a.mesh.faces[ea_t.face as usize].normal;

        for (eb_idx, eb_twin) in hull_b.mesh.undirected_edges() {
            let eb = &hull_b.mesh.half_edges[eb_idx as usize];
            let eb_t = &hull_b.mesh.half_edges[eb_twin as usize];
            let pb = hull_b.mesh.vertices[eb.origin as usize];
            let qb = hull_b.mesh.vertices[eb_t.origin as usize];
            let dir_b = qb - pb;
            let m1 = hull_b.mesh.faces[eb.face as usize].normal;
            let m2 = hull_b.mesh.faces[eb_t.face as usize].normal;

            if !builds_minkowski_face(n1, n2, m1, m2, dir_a, dir_b) {
                continue;
            }

            let mut axis = dir_a.cross(&dir_b);
            if axis.norm_squared() < SEPARATION_EPSILON {
                continue;
            }
            axis = axis.normalize();
            if axis.dot(&(center_a - pa)) > 0.0 {
                axis = -axis;
            }

            let d = axis.dot(&(pa.coords - hull_b.support_point(-axis).coords));
            if d < 0.0 {
                return None; // separating axis found
            }
            if best.as_ref().map_or(true, |b| d < b.penetration) {
                best = Some(ClosestEdges {
                    normal: axis,
                    penetration: d,
                    edge_a: ea_idx,
                    edge_b: eb_idx,
                });
            }
        }
    }

    best
}

/// Gauss-map arc-crossing test: do the two edges' adjacent face-normal
/// pairs straddle each other, making `(edge_a, edge_b)` a genuine
/// Minkowski-face edge pair rather than a spurious axis.
fn builds_minkowski_face(n1: Vector, n2: Vector, m1: Vector, m2: Vector, dir_a: Vector, dir_b: Vector) -> bool {
    let adc = n1.dot(&dir_b);
    let bdc = n2.dot(&dir_b);
    let cba = (-m1).dot(&dir_a);
    let dba = (-m2).dot(&dir_a);
    cba * dba < 0.0 && adc * bdc < 0.0 && cba * bdc > 0.0
}

fn generate_edge_contact(
    hull_a: &ConvexHull,
    hull_b: &ConvexHull,
    edges: &ClosestEdges,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> ContactManifold {
    let ea = &hull_a.mesh.half_edges[edges.edge_a as usize];
    let ea_t = &hull_a.mesh.half_edges[hull_a.mesh.half_edges[edges.edge_a as usize].twin as usize];
    let pa = hull_a.mesh.vertices[ea.origin as usize];
    let qa = hull_a.mesh.vertices[ea_t.origin as usize];

    let eb = &hull_b.mesh.half_edges[edges.edge_b as usize];
    let eb_t = &hull_b.mesh.half_edges[hull_b.mesh.half_edges[edges.edge_b as usize].twin as usize];
    let pb = hull_b.mesh.vertices[eb.origin as usize];
    let qb = hull_b.mesh.vertices[eb_t.origin as usize];

    let (on_a, on_b) = crate::geometry::capsule::closest_points_segment_segment(pa, qa, pb, qb);

    let mut manifold = ContactManifold::new(mat1, mat2);
    manifold.push(ContactPoint {
        position1: on_a,
        position2: on_b,
        normal: edges.normal,
        penetration: -edges.penetration,
        id: ContactId {
            feature_a: edges.edge_a,
            feature_b: edges.edge_b,
        },
    });
    manifold
}

fn generate_face_contacts(
    ref_hull: &ConvexHull,
    incident_hull: &ConvexHull,
    ref_face: u32,
    incident_face: u32,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
    ref_is_a: bool,
) -> Option<ContactManifold> {
    let ref_plane = &ref_hull.mesh.faces[ref_face as usize];
    let incident_verts = incident_hull.mesh.face_vertices(incident_face);
    let clipped = clip_against_reference_face(ref_hull, ref_face, incident_verts);

    let mut candidates: Vec<ContactPoint> = Vec::new();
    for (i, p) in clipped.into_iter().enumerate() {
        let depth = ref_plane.plane_distance(p);
        if depth >= 0.0 {
            continue;
        }
        let projected = p - ref_plane.normal * depth;
        let (position1, position2, normal) = if ref_is_a {
            (projected, p, ref_plane.normal)
        } else {
            (p, projected, -ref_plane.normal)
        };
        candidates.push(ContactPoint {
            position1,
            position2,
            normal,
            penetration: depth,
            id: ContactId {
                feature_a: ref_face,
                feature_b: incident_face * 64 + i as u32,
            },
        });
    }

    if candidates.is_empty() {
        return None;
    }
    let candidates = if candidates.len() > 4 {
        enforce_four_contacts(candidates)
    } else {
        candidates
    };

    let mut manifold = ContactManifold::new(mat1, mat2);
    for c in candidates {
        let _ = manifold.points.try_push(c);
    }
    Some(manifold)
}

/// Clips `polygon` against every side plane of `ref_face` -- the planes
/// of the faces adjacent across each of its edges (Sutherland-Hodgman,
/// §4.5).
fn clip_against_reference_face(ref_hull: &ConvexHull, ref_face: u32, polygon: Vec<Point>) -> Vec<Point> {
    let mut current = polygon;
    let edges: Vec<(u32, u32)> = ref_hull
        .mesh
        .face_loop(ref_face)
        .map(|e| (e.origin, e.twin))
        .collect();

    for (origin, twin) in edges {
        if current.is_empty() {
            break;
        }
        let neighbor_face = ref_hull.mesh.half_edges[twin as usize].face;
        let plane = &ref_hull.mesh.faces[neighbor_face as usize];
        let plane_point = ref_hull.mesh.vertices[origin as usize];
        current = clip_polygon_by_halfspace(&current, plane_point, plane.normal);
    }
    current
}

fn clip_polygon_by_halfspace(polygon: &[Point], plane_point: Point, plane_normal: Vector) -> Vec<Point> {
    if polygon.is_empty() {
        return Vec::new();
    }
    let n = polygon.len();
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let cur = polygon[i];
        let next = polygon[(i + 1) % n];
        let d_cur = plane_normal.dot(&(cur - plane_point));
        let d_next = plane_normal.dot(&(next - plane_point));
        if d_cur <= 0.0 {
            out.push(cur);
        }
        if (d_cur <= 0.0) != (d_next <= 0.0) {
            let t = d_cur / (d_cur - d_next);
            out.push(cur + (next - cur) * t);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{Isometry, Translation};

    #[test]
    fn stacked_cubes_produce_a_four_point_face_manifold() {
        let a = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let b = a.transform_by(&Isometry::from_parts(
            Translation::new(0.0, 1.9, 0.0),
            Default::default(),
        ));
        let mut cache = HullContactCache::default();
        let m = generate(&a, &b, PhysicsMaterial::default(), PhysicsMaterial::default(), &mut cache);
        assert!(m.is_some());
        assert!(cache.is_face_axis);
    }

    #[test]
    fn separated_cubes_produce_no_manifold() {
        let a = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let b = a.transform_by(&Isometry::from_parts(
            Translation::new(10.0, 0.0, 0.0),
            Default::default(),
        ));
        let mut cache = HullContactCache::default();
        let m = generate(&a, &b, PhysicsMaterial::default(), PhysicsMaterial::default(), &mut cache);
        assert!(m.is_none());
    }
}
