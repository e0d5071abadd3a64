use crate::geometry::capsule::{closest_points_segment_segment, Capsule};
use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::geometry::triangle::Triangle;
use crate::geometry::trimesh::TriangleMesh;
use crate::math::{Isometry, Point, Real, Vector};

const PARALLEL_TOLERANCE: Real = 0.05;

/// Capsule-triangles (§4.5): per triangle, closest points between the
/// capsule line and the triangle. If the line is nearly parallel to the
/// triangle's plane, project both endpoints and keep those landing inside
/// the triangle; else a single contact along the join direction. Capped
/// at 4 points total.
pub fn generate(
    capsule: &Capsule,
    mesh: &TriangleMesh,
    mesh_pose: &Isometry,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let (a, b) = capsule.segment();
    let radius = capsule.radius;
    let half_extent = Vector::new(radius, radius, radius);
    let world_aabb = crate::geometry::aabb::Aabb::new(a.inf(&b) - half_extent, a.sup(&b) + half_extent);
    let local_query = crate::geometry::aabb::Aabb::new(
        mesh_pose.inverse() * world_aabb.min,
        mesh_pose.inverse() * world_aabb.max,
    );

    let mut manifold = ContactManifold::new(mat1, mat2);

    for ti in mesh.get_triangles_overlapped(&local_query) {
        let local_tri = mesh.triangle(ti);
        let tri = Triangle::new(mesh_pose * local_tri.a, mesh_pose * local_tri.b, mesh_pose * local_tri.c);
        let normal = tri.normal();
        let dir = (b - a).try_normalize(crate::math::DEFAULT_EPSILON).unwrap_or(Vector::z());
        let parallel = dir.dot(&normal).abs() < PARALLEL_TOLERANCE;

        if parallel {
            for endpoint in [a, b] {
                // Orient toward the endpoint's side, so `push_contact`
                // (which negates this) stores a final normal pointing
                // from the capsule into the mesh, whatever the mesh's own
                // winding is.
                let raw_dist = normal.dot(&(endpoint - tri.a));
                let oriented = if raw_dist < 0.0 { -normal } else { normal };
                let plane_dist = oriented.dot(&(endpoint - tri.a));
                if plane_dist.abs() >= radius {
                    continue;
                }
                let projected = endpoint - oriented * plane_dist;
                if !tri.contains_projected(projected) {
                    continue;
                }
                push_contact(&mut manifold, endpoint, projected, oriented, radius, ti);
            }
        } else {
            let (on_line, on_tri) = closest_line_triangle(a, b, &tri);
            let dist = (on_line - on_tri).norm();
            if dist < radius {
                let n = (on_line - on_tri)
                    .try_normalize(crate::math::DEFAULT_EPSILON)
                    .unwrap_or(normal);
                push_contact(&mut manifold, on_line, on_tri, n, radius, ti);
            }
        }
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

fn push_contact(
    manifold: &mut ContactManifold,
    on_line: Point,
    on_surface: Point,
    normal: Vector,
    radius: Real,
    triangle_index: u32,
) {
    let dist = (on_line - on_surface).norm();
    manifold.push(ContactPoint {
        position1: on_line - normal * radius,
        position2: on_surface,
        normal: -normal,
        penetration: dist - radius,
        id: ContactId {
            feature_a: 0,
            feature_b: triangle_index,
        },
    });
}

/// Closest point on segment `[a, b]` and on triangle `tri`; approximated
/// by the minimum over the segment-vs-each-triangle-edge closest pairs
/// and the segment endpoints' closest point on the triangle's face.
fn closest_line_triangle(a: Point, b: Point, tri: &Triangle) -> (Point, Point) {
    let mut best_line = a;
    let mut best_tri = tri.closest_point(a);
    let mut best_dist = (best_line - best_tri).norm_squared();

    for p in [a, b] {
        let c = tri.closest_point(p);
        let d = (p - c).norm_squared();
        if d < best_dist {
            best_dist = d;
            best_line = p;
            best_tri = c;
        }
    }

    for (p0, p1) in [(tri.a, tri.b), (tri.b, tri.c), (tri.c, tri.a)] {
        let (on_seg, on_edge) = closest_points_segment_segment(a, b, p0, p1);
        let d = (on_seg - on_edge).norm_squared();
        if d < best_dist {
            best_dist = d;
            best_line = on_seg;
            best_tri = on_edge;
        }
    }

    (best_line, best_tri)
}

#[cfg(test)]
mod test {
    use super::*;

    fn ground() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point::new(-10.0, 0.0, -10.0),
                Point::new(10.0, 0.0, -10.0),
                Point::new(10.0, 0.0, 10.0),
                Point::new(-10.0, 0.0, 10.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn capsule_resting_on_ground_produces_contacts() {
        let mesh = ground();
        let capsule = Capsule::new(Point::new(-1.0, 0.4, 0.0), Point::new(1.0, 0.4, 0.0), 0.5);
        let m = generate(&capsule, &mesh, &Isometry::identity(), PhysicsMaterial::default(), PhysicsMaterial::default());
        assert!(m.is_some());
    }
}
