use crate::geometry::capsule::Capsule;
use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::geometry::convex_hull::ConvexHull;
use crate::math::{Point, Real, Vector};

const PARALLEL_TOLERANCE: Real = 0.05;
const LINE_SAMPLES: usize = 9;

/// Capsule-hull (§4.5). Three cases: the capsule line is fully inside the
/// hull (push out along the nearest face), the line is (nearly) parallel
/// to the closest face (clip the line against that face's side planes),
/// or neither (a single contact along the closest-point join direction).
pub fn generate(
    capsule: &Capsule,
    hull: &ConvexHull,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let (a, b) = capsule.segment();
    let mut manifold = ContactManifold::new(mat1, mat2);

    if hull.contains_point(a) && hull.contains_point(b) {
        let face = nearest_face_to_line(hull, a, b);
        let normal = hull.mesh.faces[face as usize].normal;
        for p in [a, b] {
            let depth = hull.mesh.faces[face as usize].plane_distance(p) - capsule.radius;
            if depth >= 0.0 {
                continue;
            }
            manifold.push(ContactPoint {
                position1: p + normal * capsule.radius,
                position2: p + normal * (capsule.radius + depth),
                normal,
                penetration: depth,
                id: ContactId::default(),
            });
        }
        return if manifold.points.is_empty() { None } else { Some(manifold) };
    }

    let (closest_on_line, closest_on_hull) = closest_points_segment_hull(a, b, hull);
    let dist = (closest_on_hull - closest_on_line).norm();
    if dist >= capsule.radius {
        return None;
    }

    let face = nearest_face_index(hull, closest_on_hull);
    let face_normal = hull.mesh.faces[face as usize].normal;
    let dir = (b - a).try_normalize(crate::math::DEFAULT_EPSILON).unwrap_or(Vector::z());
    let parallel = dir.dot(&face_normal).abs() < PARALLEL_TOLERANCE;

    if parallel {
        if let Some((s0, s1)) = clip_segment_to_face(hull, face, a, b) {
            for p in [s0, s1] {
                let depth = hull.mesh.faces[face as usize].plane_distance(p) - capsule.radius;
                if depth >= 0.0 {
                    continue;
                }
                manifold.push(ContactPoint {
                    position1: p + face_normal * capsule.radius,
                    position2: p + face_normal * (capsule.radius + depth),
                    normal: face_normal,
                    penetration: depth,
                    id: ContactId::default(),
                });
            }
        }
        if manifold.points.is_empty() {
            push_single_contact(&mut manifold, closest_on_line, closest_on_hull, capsule.radius);
        }
    } else {
        push_single_contact(&mut manifold, closest_on_line, closest_on_hull, capsule.radius);
    }

    if manifold.points.is_empty() {
        None
    } else {
        Some(manifold)
    }
}

fn push_single_contact(manifold: &mut ContactManifold, on_line: Point, on_hull: Point, radius: Real) {
    let delta = on_line - on_hull;
    let dist = delta.norm();
    let normal = delta
        .try_normalize(crate::math::DEFAULT_EPSILON)
        .unwrap_or(Vector::y());
    manifold.push(ContactPoint {
        position1: on_line - normal * radius,
        position2: on_hull,
        normal: -normal,
        penetration: dist - radius,
        id: ContactId::default(),
    });
}

fn nearest_face_to_line(hull: &ConvexHull, a: Point, b: Point) -> u32 {
    let mut best = 0u32;
    let mut best_score = Real::MIN;
    for (i, f) in hull.mesh.faces.iter().enumerate() {
        let score = 0.5 * (f.plane_distance(a) + f.plane_distance(b));
        if score > best_score {
            best_score = score;
            best = i as u32;
        }
    }
    best
}

fn nearest_face_index(hull: &ConvexHull, p: Point) -> u32 {
    let mut best = 0u32;
    let mut best_dist = Real::MAX;
    for (i, f) in hull.mesh.faces.iter().enumerate() {
        let d = f.plane_distance(p).abs();
        if d < best_dist {
            best_dist = d;
            best = i as u32;
        }
    }
    best
}

/// Coarse closest-point pair between a line segment and a convex hull's
/// boundary: sample the segment and take the hull's closest boundary
/// point at each sample, keeping the nearest pair.
fn closest_points_segment_hull(a: Point, b: Point, hull: &ConvexHull) -> (Point, Point) {
    let mut best_on_line = a;
    let mut best_on_hull = hull.closest_point(a);
    let mut best_dist = (best_on_hull - a).norm_squared();
    for i in 1..=LINE_SAMPLES {
        let t = i as Real / LINE_SAMPLES as Real;
        let sample = a + (b - a) * t;
        let on_hull = hull.closest_point(sample);
        let d = (on_hull - sample).norm_squared();
        if d < best_dist {
            best_dist = d;
            best_on_line = sample;
            best_on_hull = on_hull;
        }
    }
    (best_on_line, best_on_hull)
}

/// Clips segment `[a, b]` against every side plane of `face`'s loop
/// (Sutherland-Hodgman restricted to a 1D segment); returns the kept
/// sub-segment, or `None` if nothing survives.
fn clip_segment_to_face(hull: &ConvexHull, face: u32, a: Point, b: Point) -> Option<(Point, Point)> {
    let verts = hull.mesh.face_vertices(face);
    let normal = hull.mesh.faces[face as usize].normal;
    let mut s0 = a;
    let mut s1 = b;

    for i in 0..verts.len() {
        let p0 = verts[i];
        let p1 = verts[(i + 1) % verts.len()];
        let edge = p1 - p0;
        let side_normal = normal.cross(&edge);

        let d0 = side_normal.dot(&(s0 - p0));
        let d1 = side_normal.dot(&(s1 - p0));

        if d0 < 0.0 && d1 < 0.0 {
            return None;
        }
        if d0 < 0.0 {
            let t = d0 / (d0 - d1);
            s0 = s0 + (s1 - s0) * t;
        } else if d1 < 0.0 {
            let t = d1 / (d1 - d0);
            s1 = s1 + (s0 - s1) * t;
        }
    }
    Some((s0, s1))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capsule_resting_flat_on_a_face_produces_two_contacts() {
        let hull = ConvexHull::cuboid(Vector::new(2.0, 1.0, 2.0));
        let capsule = Capsule::new(Point::new(-1.0, 1.1, 0.0), Point::new(1.0, 1.1, 0.0), 0.2);
        let m = generate(&capsule, &hull, PhysicsMaterial::default(), PhysicsMaterial::default());
        assert!(m.is_some());
    }

    #[test]
    fn distant_capsule_produces_no_contact() {
        let hull = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let capsule = Capsule::new(Point::new(-1.0, 10.0, 0.0), Point::new(1.0, 10.0, 0.0), 0.2);
        let m = generate(&capsule, &hull, PhysicsMaterial::default(), PhysicsMaterial::default());
        assert!(m.is_none());
    }
}
