use crate::geometry::capsule::Capsule;
use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::math::Point;

/// Sphere-capsule: project the sphere center onto the capsule's core
/// segment, then treat it as sphere-sphere against that projected point
/// (§4.5).
pub fn generate(
    center: Point,
    radius: crate::math::Real,
    capsule: &Capsule,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let closest = capsule.closest_point_on_segment(center);
    super::sphere_sphere::generate(center, radius, closest, capsule.radius, mat1, mat2)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point;

    #[test]
    fn sphere_touching_capsule_side_produces_a_contact() {
        let capsule = Capsule::new(Point::new(0.0, -1.0, 0.0), Point::new(0.0, 1.0, 0.0), 0.5);
        let m = generate(
            Point::new(0.9, 0.0, 0.0),
            0.5,
            &capsule,
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        );
        assert!(m.is_some());
    }

    #[test]
    fn distant_sphere_produces_no_contact() {
        let capsule = Capsule::new(Point::new(0.0, -1.0, 0.0), Point::new(0.0, 1.0, 0.0), 0.5);
        let m = generate(
            Point::new(10.0, 0.0, 0.0),
            0.5,
            &capsule,
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        );
        assert!(m.is_none());
    }
}
