//! Gilbert-Johnson-Keerthi distance/overlap queries between two convex
//! support-mapped shapes (§4.2).

use crate::math::{Point, Real, Vector};
use arrayvec::ArrayVec;

const MAX_ITERATIONS: u32 = 64;
const TOLERANCE: Real = 1.0e-4;

/// One vertex of the evolving simplex: the Minkowski-difference point
/// `w = sA - sB`, plus the witness points on each shape it came from.
#[derive(Copy, Clone, Debug)]
struct SimplexPoint {
    w: Vector,
    sa: Point,
    sb: Point,
}

/// Outcome of a GJK query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GjkStatus {
    /// The shapes overlap (or are within numerical tolerance of touching).
    Overlapping,
    /// The shapes are separated by (at least) `distance`, with witness
    /// points on each shape's surface.
    Separated {
        distance: Real,
        witness_a: Point,
        witness_b: Point,
    },
    /// The algorithm could not make progress (iteration cap or numerical
    /// failure); treated as separated per the engine-wide error policy
    /// (§7): never fatal in release, just a best-effort sentinel.
    Failed,
}

/// Runs GJK to completion and reports only the overlap boolean, matching
/// `SAT ⇔ GJK parity` (§8).
pub fn gjk_overlap(
    mut support_a: impl FnMut(Vector) -> Point,
    mut support_b: impl FnMut(Vector) -> Point,
) -> bool {
    matches!(
        gjk_distance(&mut support_a, &mut support_b, Vector::x()),
        GjkStatus::Overlapping
    )
}

/// Full GJK distance query; returns witness points even when separated,
/// as required by the TOI separation function (§4.6).
pub fn gjk_distance(
    mut support_a: impl FnMut(Vector) -> Point,
    mut support_b: impl FnMut(Vector) -> Point,
    initial_dir: Vector,
) -> GjkStatus {
    let mut direction = if initial_dir.norm_squared() < TOLERANCE {
        Vector::x()
    } else {
        initial_dir
    };

    let mut simplex: ArrayVec<SimplexPoint, 4> = ArrayVec::new();
    simplex.push(support(&mut support_a, &mut support_b, direction));

    let mut prev_distance = Real::MAX;

    for _ in 0..MAX_ITERATIONS {
        let last = *simplex.last().unwrap();
        if last.w.dot(&direction) < 0.0 && !simplex.is_empty() {
            // The most recent support point didn't pass the origin side
            // of `direction`: no further progress possible toward overlap.
            if simplex.len() == 1 {
                return separated_result(&simplex, direction);
            }
        }

        if simplex.len() == 4 {
            if tetrahedron_contains_origin(&simplex) {
                return GjkStatus::Overlapping;
            }
        }

        let (new_simplex, new_direction, distance) = reduce_simplex(&simplex);
        simplex = new_simplex;

        if distance < TOLERANCE {
            return GjkStatus::Overlapping;
        }
        if prev_distance - distance < TOLERANCE * prev_distance.max(1.0) && prev_distance != Real::MAX
        {
            // Stagnation: successive distance decrease below eps*prev.
            return separated_result(&simplex, new_direction);
        }
        if distance >= prev_distance {
            // Numerical failure: distance not decreasing.
            return separated_result(&simplex, new_direction);
        }
        prev_distance = distance;
        direction = new_direction;

        if simplex.len() == 4 {
            return separated_result(&simplex, direction);
        }

        let candidate = support(&mut support_a, &mut support_b, direction);
        if simplex.iter().any(|p| (p.w - candidate.w).norm_squared() < TOLERANCE * TOLERANCE) {
            // Repeated support point: no new progress available.
            return separated_result(&simplex, direction);
        }
        simplex.push(candidate);
    }

    log::warn!("gjk: iteration cap ({}) reached, returning best-effort separated result", MAX_ITERATIONS);
    GjkStatus::Failed
}

fn support(
    support_a: &mut impl FnMut(Vector) -> Point,
    support_b: &mut impl FnMut(Vector) -> Point,
    direction: Vector,
) -> SimplexPoint {
    let sa = support_a(direction);
    let sb = support_b(-direction);
    SimplexPoint {
        w: sa - sb,
        sa,
        sb,
    }
}

fn tetrahedron_contains_origin(simplex: &ArrayVec<SimplexPoint, 4>) -> bool {
    let [a, b, c, d] = [simplex[0].w, simplex[1].w, simplex[2].w, simplex[3].w];
    let signs: [Real; 4] = [
        (b - a).cross(&(c - a)).dot(&(d - a)),
        (a - b).cross(&(d - b)).dot(&(c - b)),
        (b - c).cross(&(d - c)).dot(&(a - c)),
        (c - d).cross(&(a - d)).dot(&(b - d)),
    ];
    signs.iter().all(|s| *s >= -TOLERANCE) || signs.iter().all(|s| *s <= TOLERANCE)
}

/// Reduces the simplex to the feature closest to the origin (barycentric
/// Johnson variant on edge/triangle/tetra), retaining only vertices with
/// positive barycentric coordinates (§4.2). Returns the reduced simplex,
/// the new search direction (negated closest point), and the distance.
fn reduce_simplex(
    simplex: &ArrayVec<SimplexPoint, 4>,
) -> (ArrayVec<SimplexPoint, 4>, Vector, Real) {
    match simplex.len() {
        1 => {
            let p = simplex[0];
            let dist = p.w.norm();
            let mut out = ArrayVec::new();
            out.push(p);
            (out, -p.w, dist)
        }
        2 => reduce_segment(simplex[0], simplex[1]),
        3 => reduce_triangle(simplex[0], simplex[1], simplex[2]),
        4 => reduce_tetrahedron(simplex),
        _ => unreachable!(),
    }
}

fn reduce_segment(a: SimplexPoint, b: SimplexPoint) -> (ArrayVec<SimplexPoint, 4>, Vector, Real) {
    let ab = b.w - a.w;
    let t = (-a.w).dot(&ab) / ab.norm_squared().max(TOLERANCE);
    let t = t.clamp(0.0, 1.0);
    let closest = a.w + ab * t;
    let mut out = ArrayVec::new();
    if t <= 0.0 {
        out.push(a);
    } else if t >= 1.0 {
        out.push(b);
    } else {
        out.push(a);
        out.push(b);
    }
    (out, -closest, closest.norm())
}

fn reduce_triangle(
    a: SimplexPoint,
    b: SimplexPoint,
    c: SimplexPoint,
) -> (ArrayVec<SimplexPoint, 4>, Vector, Real) {
    let (u, v, w) = barycentric(a.w, b.w, c.w, Vector::zeros().into());
    if u >= 0.0 && v >= 0.0 && w >= 0.0 {
        let closest = a.w * u + b.w * v + c.w * w;
        let mut out = ArrayVec::new();
        out.push(a);
        out.push(b);
        out.push(c);
        return (out, -closest, closest.norm());
    }
    // Fall back to the closest of the three edges.
    let candidates = [(a, b), (b, c), (a, c)];
    let mut best: Option<(ArrayVec<SimplexPoint, 4>, Vector, Real)> = None;
    for (p, q) in candidates {
        let (simplex, dir, dist) = reduce_segment(p, q);
        if best.as_ref().map_or(true, |(_, _, bd)| dist < *bd) {
            best = Some((simplex, dir, dist));
        }
    }
    best.unwrap()
}

fn reduce_tetrahedron(
    simplex: &ArrayVec<SimplexPoint, 4>,
) -> (ArrayVec<SimplexPoint, 4>, Vector, Real) {
    let faces = [
        (simplex[0], simplex[1], simplex[2]),
        (simplex[0], simplex[1], simplex[3]),
        (simplex[0], simplex[2], simplex[3]),
        (simplex[1], simplex[2], simplex[3]),
    ];
    let mut best: Option<(ArrayVec<SimplexPoint, 4>, Vector, Real)> = None;
    for (a, b, c) in faces {
        let (simplex, dir, dist) = reduce_triangle(a, b, c);
        if best.as_ref().map_or(true, |(_, _, bd)| dist < *bd) {
            best = Some((simplex, dir, dist));
        }
    }
    best.unwrap()
}

/// Barycentric coordinates of `p` (here always the origin) with respect to
/// triangle `(a, b, c)`, projected onto the triangle's own plane.
fn barycentric(a: Vector, b: Vector, c: Vector, p: Point) -> (Real, Real, Real) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p.coords - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < TOLERANCE {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}

fn separated_result(simplex: &ArrayVec<SimplexPoint, 4>, direction: Vector) -> GjkStatus {
    let (weights, points) = simplex_barycentric_witnesses(simplex);
    let mut witness_a = Point::origin();
    let mut witness_b = Point::origin();
    for (w, p) in weights.iter().zip(points.iter()) {
        witness_a += (*w * p.sa.coords).into();
        witness_b += (*w * p.sb.coords).into();
    }
    let distance = (witness_a - witness_b).norm();
    let _ = direction;
    GjkStatus::Separated {
        distance,
        witness_a: witness_a.into(),
        witness_b: witness_b.into(),
    }
}

fn simplex_barycentric_witnesses(
    simplex: &ArrayVec<SimplexPoint, 4>,
) -> (ArrayVec<Real, 4>, ArrayVec<SimplexPoint, 4>) {
    let mut weights = ArrayVec::new();
    match simplex.len() {
        1 => weights.push(1.0),
        2 => {
            let ab = simplex[1].w - simplex[0].w;
            let t = ((-simplex[0].w).dot(&ab) / ab.norm_squared().max(TOLERANCE)).clamp(0.0, 1.0);
            weights.push(1.0 - t);
            weights.push(t);
        }
        3 => {
            let (u, v, w) = barycentric(simplex[0].w, simplex[1].w, simplex[2].w, Point::origin());
            weights.push(u);
            weights.push(v);
            weights.push(w);
        }
        _ => {
            for _ in 0..simplex.len() {
                weights.push(1.0 / simplex.len() as Real);
            }
        }
    }
    (weights, simplex.clone())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Ball;

    #[test]
    fn overlapping_spheres_report_overlap() {
        let a = Ball::new(1.0);
        let b = Ball::new(1.0);
        let ca = Point::new(0.0, 0.0, 0.0);
        let cb = Point::new(1.5, 0.0, 0.0);
        let status = gjk_distance(
            |d| a.support_point(ca, d),
            |d| b.support_point(cb, d),
            Vector::x(),
        );
        assert_eq!(status, GjkStatus::Overlapping);
    }

    #[test]
    fn separated_spheres_report_correct_distance() {
        let a = Ball::new(1.0);
        let b = Ball::new(1.0);
        let ca = Point::new(0.0, 0.0, 0.0);
        let cb = Point::new(5.0, 0.0, 0.0);
        match gjk_distance(|d| a.support_point(ca, d), |d| b.support_point(cb, d), Vector::x()) {
            GjkStatus::Separated { distance, .. } => assert!((distance - 3.0).abs() < 1.0e-2),
            other => panic!("expected separated, got {:?}", other),
        }
    }
}
