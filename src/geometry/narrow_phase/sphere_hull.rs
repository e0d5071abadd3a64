use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::geometry::convex_hull::ConvexHull;
use crate::math::{Point, Real};

/// Sphere-hull (§4.5): `closest = hull.closestPoint(center)`. If the
/// center is inside the hull, push out along the nearest face's normal
/// instead of toward the (degenerate, interior) closest boundary point.
pub fn generate(
    center: Point,
    radius: Real,
    hull: &ConvexHull,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let inside = hull.contains_point(center);

    let (normal, penetration) = if inside {
        let face = hull.face_closest_to_interior_point(center);
        let n = hull.mesh.faces[face as usize].normal;
        let depth = hull.mesh.faces[face as usize].plane_distance(center);
        (n, depth - radius)
    } else {
        let closest = hull.closest_point(center);
        let delta = center - closest;
        let dist = delta.norm();
        if dist >= radius {
            return None;
        }
        let n = delta
            .try_normalize(crate::math::DEFAULT_EPSILON)
            .unwrap_or(crate::math::Vector::y());
        (-n, dist - radius)
    };

    if penetration >= 0.0 {
        return None;
    }

    let mut manifold = ContactManifold::new(mat1, mat2);
    manifold.push(ContactPoint {
        position1: center + normal * radius,
        position2: center + normal * (radius + penetration),
        normal,
        penetration,
        id: ContactId::default(),
    });
    Some(manifold)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Vector;

    #[test]
    fn sphere_outside_but_overlapping_hull_produces_a_contact() {
        let hull = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let m = generate(
            Point::new(1.3, 0.0, 0.0),
            0.5,
            &hull,
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        );
        assert!(m.is_some());
    }

    #[test]
    fn sphere_center_inside_hull_pushes_out_along_nearest_face() {
        let hull = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let m = generate(
            Point::new(0.9, 0.0, 0.0),
            0.2,
            &hull,
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        )
        .unwrap();
        assert!(m.points[0].normal.x > 0.0);
    }
}
