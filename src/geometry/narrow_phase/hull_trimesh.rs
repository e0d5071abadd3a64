use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::geometry::convex_hull::ConvexHull;
use crate::geometry::trimesh::TriangleMesh;
use crate::math::Isometry;

/// Hull-triangles (§4.5): per triangle intersecting the hull's AABB, every
/// hull vertex that the triangle plane has on its negative side and whose
/// projection onto the plane lies inside the triangle becomes a contact.
/// Capped at 4 points total.
pub fn generate(
    hull: &ConvexHull,
    mesh: &TriangleMesh,
    mesh_pose: &Isometry,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let world_aabb = hull.aabb();
    let local_query = crate::geometry::aabb::Aabb::new(
        mesh_pose.inverse() * world_aabb.min,
        mesh_pose.inverse() * world_aabb.max,
    );
    let hull_centroid = world_aabb.center();

    let mut manifold = ContactManifold::new(mat1, mat2);

    'triangles: for ti in mesh.get_triangles_overlapped(&local_query) {
        let local_tri = mesh.triangle(ti);
        let tri = crate::geometry::triangle::Triangle::new(
            mesh_pose * local_tri.a,
            mesh_pose * local_tri.b,
            mesh_pose * local_tri.c,
        );
        // The mesh's own winding is whatever the caller authored; orient
        // the plane normal away from the hull's side (collider1 = hull,
        // collider2 = mesh, per `contact.rs`'s normal convention) so
        // "has crossed the plane" below consistently means "penetrating",
        // not an arbitrary function of triangle index order.
        let raw = tri.normal();
        let normal = if raw.dot(&(hull_centroid - tri.a)) < 0.0 { raw } else { -raw };

        for (vi, vertex) in hull.vertices().iter().enumerate() {
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
                id: ContactId {
                    feature_a: vi as u32,
                    feature_b: ti,
                },
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{Point, Vector};

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
    fn box_resting_on_mesh_produces_contacts() {
        let mesh = ground();
        let hull = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0)).transform_by(&Isometry::translation(0.0, 0.9, 0.0));
        let m = generate(&hull, &mesh, &Isometry::identity(), PhysicsMaterial::default(), PhysicsMaterial::default());
        assert!(m.is_some());
        assert!(m.unwrap().points.len() <= 4);
    }

    #[test]
    fn box_far_above_mesh_produces_no_contact() {
        let mesh = ground();
        let hull = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0)).transform_by(&Isometry::translation(0.0, 10.0, 0.0));
        let m = generate(&hull, &mesh, &Isometry::identity(), PhysicsMaterial::default(), PhysicsMaterial::default());
        assert!(m.is_none());
    }
}
