use crate::geometry::collider::PhysicsMaterial;
use crate::math::{Point, Real, Vector};

/// A pair of feature indices from the narrow-phase algorithm that
/// generated a contact point, used as the warm-start lookup key (§3).
/// Sphere/capsule manifolds only ever have one point, so `feature_a` /
/// `feature_b` are `0`; hull-vs-hull manifolds use the clipped vertex
/// index on each side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ContactId {
    pub feature_a: u32,
    pub feature_b: u32,
}

/// One point of contact between two colliders.
#[derive(Copy, Clone, Debug)]
pub struct ContactPoint {
    /// World-space point on collider 1's surface.
    pub position1: Point,
    /// World-space point on collider 2's surface.
    pub position2: Point,
    /// Contact normal, from collider 1 toward collider 2.
    pub normal: Vector,
    /// Negative penetration depth (positive == separated by that much);
    /// computed as `dot(normal, position2 - position1)`.
    pub penetration: Real,
    pub id: ContactId,
}

/// Up to four contact points between one pair of colliders for one step
/// (§3). Transient: built on the stack by the narrow phase, then either
/// discarded (no penetration) or moved into the solver's per-step list.
#[derive(Clone, Debug, Default)]
pub struct ContactManifold {
    pub points: arrayvec::ArrayVec<ContactPoint, 4>,
    pub material1: PhysicsMaterial,
    pub material2: PhysicsMaterial,
}

impl ContactManifold {
    pub fn new(material1: PhysicsMaterial, material2: PhysicsMaterial) -> Self {
        Self {
            points: arrayvec::ArrayVec::new(),
            material1,
            material2,
        }
    }

    pub fn push(&mut self, point: ContactPoint) {
        if self.points.len() == self.points.capacity() {
            reduce_to_four(&mut self.points, point);
        } else {
            self.points.push(point);
        }
    }

    pub fn is_penetrating(&self) -> bool {
        self.points.iter().any(|p| p.penetration < 0.0)
    }

    pub fn average_normal(&self) -> Vector {
        let sum: Vector = self.points.iter().map(|p| p.normal).sum();
        sum.try_normalize(crate::math::DEFAULT_EPSILON)
            .unwrap_or(Vector::y())
    }

    pub fn deepest_point(&self) -> Option<&ContactPoint> {
        self.points
            .iter()
            .min_by(|a, b| a.penetration.partial_cmp(&b.penetration).unwrap())
    }
}

/// "enforce 4 contacts" (§4.5, §9 REDESIGN): given more than four candidate
/// points, keep the deepest, the one farthest from it, and two more chosen
/// to maximise the area of the resulting quadrilateral.
pub fn reduce_to_four(existing: &mut arrayvec::ArrayVec<ContactPoint, 4>, candidate: ContactPoint) {
    let mut pool: Vec<ContactPoint> = existing.iter().copied().collect();
    pool.push(candidate);
    existing.clear();
    for p in enforce_four_contacts(pool) {
        let _ = existing.try_push(p);
    }
}

/// Standalone entry point used both by [`reduce_to_four`] (incremental,
/// one point past capacity) and directly by narrow-phase routines that
/// build an unbounded candidate list up front (hull-vs-hull face clipping,
/// §4.5) before ever touching a fixed-size manifold.
pub fn enforce_four_contacts(mut candidates: Vec<ContactPoint>) -> Vec<ContactPoint> {
    if candidates.len() <= 4 {
        return candidates;
    }

    let deepest_idx = candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.penetration.partial_cmp(&b.penetration).unwrap())
        .map(|(i, _)| i)
        .unwrap();
    let deepest = candidates.swap_remove(deepest_idx);

    let farthest_idx = candidates
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            (a.position1 - deepest.position1)
                .norm_squared()
                .partial_cmp(&(b.position1 - deepest.position1).norm_squared())
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap();
    let farthest = candidates.swap_remove(farthest_idx);

    let normal = deepest.normal;
    let (t1, t2) = crate::utils::perpendicular_basis(&normal);
    let project = |p: Point| (t1.dot(&p.coords), t2.dot(&p.coords));
    let (dx, dy) = project(deepest.position1);
    let (fx, fy) = project(farthest.position1);

    let mut best_pair = None;
    let mut best_area = -1.0;
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let (cx, cy) = project(candidates[i].position1);
            let (ex, ey) = project(candidates[j].position1);
            let area = quad_area((dx, dy), (cx, cy), (fx, fy), (ex, ey));
            if area > best_area {
                best_area = area;
                best_pair = Some((i, j));
            }
        }
    }

    let mut result = vec![deepest, farthest];
    if let Some((i, j)) = best_pair {
        // Remove the larger index first so the smaller stays valid.
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        result.push(candidates.remove(hi));
        result.push(candidates.remove(lo));
    }
    result
}

fn quad_area(a: (Real, Real), b: (Real, Real), c: (Real, Real), d: (Real, Real)) -> Real {
    let shoelace = |p: (Real, Real), q: (Real, Real)| p.0 * q.1 - q.0 * p.1;
    0.5 * (shoelace(a, b) + shoelace(b, c) + shoelace(c, d) + shoelace(d, a)).abs()
}

/// Symmetric "Cantor-like" pairing function used to key the per-step
/// finished-collisions table (§4.7): `pair(min, max) = (A+B)(A+B+1)/2 + min(A,B)`.
pub fn pair_key(a: u64, b: u64) -> u64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let sum = lo + hi;
    sum * (sum + 1) / 2 + lo
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pair_key_is_symmetric() {
        assert_eq!(pair_key(3, 9), pair_key(9, 3));
        assert_ne!(pair_key(3, 9), pair_key(3, 10));
    }

    fn point_at(x: Real, y: Real, pen: Real) -> ContactPoint {
        ContactPoint {
            position1: Point::new(x, y, 0.0),
            position2: Point::new(x, y, pen),
            normal: Vector::z(),
            penetration: pen,
            id: ContactId::default(),
        }
    }

    #[test]
    fn enforce_four_contacts_keeps_deepest_point() {
        let candidates = vec![
            point_at(0.0, 0.0, -0.5),
            point_at(1.0, 0.0, -0.1),
            point_at(1.0, 1.0, -0.1),
            point_at(0.0, 1.0, -0.1),
            point_at(0.5, 0.5, -0.1),
        ];
        let reduced = enforce_four_contacts(candidates);
        assert_eq!(reduced.len(), 4);
        assert!(reduced.iter().any(|p| p.penetration == -0.5));
    }
}
