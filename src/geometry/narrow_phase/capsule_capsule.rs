use crate::geometry::capsule::{closest_points_segment_segment, Capsule};
use crate::geometry::collider::PhysicsMaterial;
use crate::geometry::contact::{ContactId, ContactManifold, ContactPoint};
use crate::math::{Point, Real};

/// Capsule-capsule (§4.5): closest points between the two core segments.
/// If the segments are coplanar and parallel, emit two contacts (one per
/// matching pair of endpoints); otherwise one.
pub fn generate(a: &Capsule, b: &Capsule, mat1: PhysicsMaterial, mat2: PhysicsMaterial) -> Option<ContactManifold> {
    let (pa, pb) = a.segment();
    let (qa, qb) = b.segment();
    let dir_a = pb - pa;
    let dir_b = qb - qa;
    let radius_sum = a.radius + b.radius;

    let parallel_coplanar = {
        let cross = dir_a.cross(&dir_b);
        let triple = cross.dot(&(qa - pa));
        cross.norm_squared() < 1.0e-6 && triple.abs() < 1.0e-4
    };

    let mut manifold = ContactManifold::new(mat1, mat2);

    if parallel_coplanar && dir_a.norm_squared() > crate::math::DEFAULT_EPSILON {
        // Two contacts: each endpoint of A paired with its closest point
        // on B's segment, and vice versa -- collapsed to the two pairs
        // that are actually distinct.
        let candidates = [
            (pa, crate::geometry::capsule::closest_point_on_segment(qa, qb, pa)),
            (pb, crate::geometry::capsule::closest_point_on_segment(qa, qb, pb)),
        ];
        for (on_a, on_b) in candidates {
            push_if_overlapping(&mut manifold, on_a, on_b, radius_sum, a.radius, b.radius);
        }
    } else {
        let (on_a, on_b) = closest_points_segment_segment(pa, pb, qa, qb);
        push_if_overlapping(&mut manifold, on_a, on_b, radius_sum, a.radius, b.radius);
    }

    if manifold.points.is_empty() {
        None
    } else {
        Some(manifold)
    }
}

fn push_if_overlapping(
    manifold: &mut ContactManifold,
    on_a: Point,
    on_b: Point,
    radius_sum: Real,
    radius_a: Real,
    radius_b: Real,
) {
    let delta = on_b - on_a;
    let dist_sq = delta.norm_squared();
    if dist_sq >= radius_sum * radius_sum {
        return;
    }
    let dist = dist_sq.sqrt();
    let normal = delta
        .try_normalize(crate::math::DEFAULT_EPSILON)
        .unwrap_or(crate::math::Vector::y());
    manifold.push(ContactPoint {
        position1: on_a + normal * radius_a,
        position2: on_b - normal * radius_b,
        normal,
        penetration: dist - radius_sum,
        id: ContactId::default(),
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crossing_capsules_produce_one_contact() {
        let a = Capsule::new(Point::new(-1.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), 0.3);
        let b = Capsule::new(Point::new(0.0, -1.0, 0.1), Point::new(0.0, 1.0, 0.1), 0.3);
        let m = generate(&a, &b, PhysicsMaterial::default(), PhysicsMaterial::default());
        assert!(m.is_some());
        assert_eq!(m.unwrap().points.len(), 1);
    }

    #[test]
    fn parallel_overlapping_capsules_produce_two_contacts() {
        let a = Capsule::new(Point::new(-1.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), 0.3);
        let b = Capsule::new(Point::new(-1.0, 0.4, 0.0), Point::new(1.0, 0.4, 0.0), 0.3);
        let m = generate(&a, &b, PhysicsMaterial::default(), PhysicsMaterial::default()).unwrap();
        assert_eq!(m.points.len(), 2);
    }
}
