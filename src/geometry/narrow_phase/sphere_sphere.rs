use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::math::{Point, Real};

/// Sphere-sphere: one contact point if `|c2 - c1|^2 < (r1+r2)^2` (§4.5).
pub fn generate(
    c1: Point,
    r1: Real,
    c2: Point,
    r2: Real,
    mat1: PhysicsMaterial,
    mat2: PhysicsMaterial,
) -> Option<ContactManifold> {
    let delta = c2 - c1;
    let dist_sq = delta.norm_squared();
    let radius_sum = r1 + r2;
    if dist_sq >= radius_sum * radius_sum {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > crate::math::DEFAULT_EPSILON {
        delta / dist
    } else {
        crate::math::Vector::y()
    };

    let mut manifold = ContactManifold::new(mat1, mat2);
    manifold.push(ContactPoint {
        position1: c1 + normal * r1,
        position2: c2 - normal * r2,
        normal,
        penetration: dist - radius_sum,
        id: ContactId::default(),
    });
    Some(manifold)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn overlapping_spheres_produce_one_contact() {
        let m = generate(
            Point::new(0.0, 0.0, 0.0),
            1.0,
            Point::new(1.5, 0.0, 0.0),
            1.0,
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        )
        .unwrap();
        assert_eq!(m.points.len(), 1);
        assert!(m.points[0].penetration < 0.0);
    }

    #[test]
    fn separated_spheres_produce_no_contact() {
        assert!(generate(
            Point::new(0.0, 0.0, 0.0),
            1.0,
            Point::new(5.0, 0.0, 0.0),
            1.0,
            PhysicsMaterial::default(),
            PhysicsMaterial::default(),
        )
        .is_none());
    }
}
