use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::geometry::trimesh::TriangleMesh;
use crate::math::{Isometry, Point, Real};

/// Sphere-triangles (§4.5): per triangle intersecting the sphere's AABB,
/// closest point on the triangle to the sphere center; emit if inside the
/// sphere, capped at 4 points.
pub fn generate(
    center: Point,
    radius: Real,
    mesh: &TriangleMesh,
    mesh_pose: &Isometry,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let half_extent = crate::math::Vector::new(radius, radius, radius);
    let local_query = crate::geometry::aabb::Aabb::new(
        mesh_pose.inverse() * (center - half_extent),
        mesh_pose.inverse() * (center + half_extent),
    );

    let mut manifold = ContactManifold::new(mat1, mat2);
    for ti in mesh.get_triangles_overlapped(&local_query) {
        let local_tri = mesh.triangle(ti);
        let world_tri = crate::geometry::triangle::Triangle::new(
            mesh_pose * local_tri.a,
            mesh_pose * local_tri.b,
            mesh_pose * local_tri.c,
        );
        let closest = world_tri.closest_point(center);
        let dist_sq = (center - closest).norm_squared();
        if dist_sq >= radius * radius {
            continue;
        }
        let dist = dist_sq.sqrt();

        // Contact normal is the triangle's own plane normal, oriented away
        // from the sphere center (collider1 = sphere, collider2 = mesh).
        let plane_normal = world_tri.normal();
        let on_negative_side = plane_normal.dot(&(center - world_tri.a)) < 0.0;
        let normal = if on_negative_side { plane_normal } else { -plane_normal };

        manifold.push(ContactPoint {
            position1: center + normal * radius,
            position2: closest,
            normal,
            penetration: dist - radius,
            id: ContactId {
                feature_a: 0,
                feature_b: ti,
            },
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
    fn sphere_resting_on_ground_produces_a_contact() {
        let mesh = ground();
        let m = generate(
            Point::new(0.0, 0.4, 0.0),
            0.5,
            &mesh,
            &Isometry::identity(),
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        );
        assert!(m.is_some());
    }

    #[test]
    fn sphere_far_above_ground_produces_no_contact() {
        let mesh = ground();
        let m = generate(
            Point::new(0.0, 10.0, 0.0),
            0.5,
            &mesh,
            &Isometry::identity(),
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        );
        assert!(m.is_none());
    }
}
