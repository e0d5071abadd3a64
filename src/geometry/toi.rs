//! Swept time-of-impact between two convex shapes under interpolated
//! transforms (§4.6): conservative advancement via a separation function,
//! root-found by alternating bisection and secant steps.

use crate::geometry::gjk::{gjk_distance, GjkStatus};
use crate::geometry::shape::ConvexShape;
use crate::math::{Isometry, Point, Real, Vector};

const OUTER_ITERATIONS: u32 = 20;
const ROOT_ITERATIONS: u32 = 20;

/// Outcome of a TOI query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ToiStatus {
    /// The shapes are already touching/overlapping at `toi`.
    Touching {
        toi: Real,
        witness_a: Point,
        witness_b: Point,
        normal: Vector,
    },
    /// The swept pair never comes within tolerance over `[0, 1]`.
    Separated,
    /// Iteration caps exhausted without resolving; treated as "didn't hit"
    /// by the broad-phase driver, per the engine-wide non-fatal error
    /// policy (§7).
    Failed,
}

/// Runs the conservative-advancement TOI search described in §4.6 between
/// two convex shapes, each swept from a `start` to an `end` isometry over
/// the unit step.
pub fn time_of_impact(
    shape_a: &ConvexShape,
    start_a: Isometry,
    end_a: Isometry,
    shape_b: &ConvexShape,
    start_b: Isometry,
    end_b: Isometry,
    tolerance: Real,
) -> ToiStatus {
    let mut t1: Real = 0.0;

    for _ in 0..OUTER_ITERATIONS {
        let iso_a = interpolate(&start_a, &end_a, t1);
        let iso_b = interpolate(&start_b, &end_b, t1);
        let world_a = shape_a.transform_by(&iso_a);
        let world_b = shape_b.transform_by(&iso_b);

        let distance_status = gjk_distance(
            |d| world_a.support_point(d),
            |d| world_b.support_point(d),
            Vector::x(),
        );

        let (axis, witness_a, witness_b) = match distance_status {
            GjkStatus::Overlapping => {
                return ToiStatus::Touching {
                    toi: t1,
                    witness_a: world_a.support_point(Vector::x()),
                    witness_b: world_b.support_point(-Vector::x()),
                    normal: Vector::x(),
                }
            }
            GjkStatus::Failed => return ToiStatus::Failed,
            GjkStatus::Separated {
                witness_a,
                witness_b,
                ..
            } => {
                let axis = (witness_b - witness_a)
                    .try_normalize(crate::math::DEFAULT_EPSILON)
                    .unwrap_or(Vector::x());
                (axis, witness_a, witness_b)
            }
        };

        let s_t1 = separation_at(shape_a, &start_a, &end_a, shape_b, &start_b, &end_b, t1, axis);
        let t2: Real = 1.0;
        let s_t2 = separation_at(shape_a, &start_a, &end_a, shape_b, &start_b, &end_b, t2, axis);

        if s_t2 > tolerance {
            return ToiStatus::Separated;
        }
        if s_t2 > -tolerance {
            t1 = t2;
            continue;
        }

        match find_root(
            shape_a, &start_a, &end_a, shape_b, &start_b, &end_b, axis, t1, t2, s_t1, s_t2,
            tolerance,
        ) {
            Some(root) => t1 = root,
            None => {
                log::warn!("toi: root search failed to converge, treating as contact at t1");
                return ToiStatus::Touching {
                    toi: t1,
                    witness_a,
                    witness_b,
                    normal: axis,
                };
            }
        }
    }

    log::warn!("toi: outer loop exceeded {} iterations", OUTER_ITERATIONS);
    ToiStatus::Failed
}

#[allow(clippy::too_many_arguments)]
fn find_root(
    shape_a: &ConvexShape,
    start_a: &Isometry,
    end_a: &Isometry,
    shape_b: &ConvexShape,
    start_b: &Isometry,
    end_b: &Isometry,
    axis: Vector,
    mut lo: Real,
    mut hi: Real,
    mut s_lo: Real,
    mut s_hi: Real,
    tolerance: Real,
) -> Option<Real> {
    for iter in 0..ROOT_ITERATIONS {
        let mid = if iter % 2 == 0 || (s_hi - s_lo).abs() < crate::math::DEFAULT_EPSILON {
            0.5 * (lo + hi)
        } else {
            (lo - s_lo * (hi - lo) / (s_hi - s_lo)).clamp(lo, hi)
        };
        let s_mid = separation_at(shape_a, start_a, end_a, shape_b, start_b, end_b, mid, axis);
        if s_mid.abs() < tolerance {
            return Some(mid);
        }
        if s_mid > 0.0 {
            lo = mid;
            s_lo = s_mid;
        } else {
            hi = mid;
            s_hi = s_mid;
        }
    }
    Some(hi)
}

#[allow(clippy::too_many_arguments)]
fn separation_at(
    shape_a: &ConvexShape,
    start_a: &Isometry,
    end_a: &Isometry,
    shape_b: &ConvexShape,
    start_b: &Isometry,
    end_b: &Isometry,
    t: Real,
    axis: Vector,
) -> Real {
    let world_a = shape_a.transform_by(&interpolate(start_a, end_a, t));
    let world_b = shape_b.transform_by(&interpolate(start_b, end_b, t));
    let max_a = axis.dot(&world_a.support_point(axis).coords);
    let min_b = axis.dot(&world_b.support_point(-axis).coords);
    min_b - max_a
}

/// Linear interpolation of translation, spherical interpolation of
/// rotation -- the standard "swept transform" used throughout CCD.
fn interpolate(start: &Isometry, end: &Isometry, t: Real) -> Isometry {
    let translation = start.translation.vector.lerp(&end.translation.vector, t);
    let rotation = start.rotation.slerp(&end.rotation, t);
    Isometry::from_parts(translation.into(), rotation)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Ball;
    use crate::math::{Point, Translation};

    fn ball_shape(radius: Real) -> ConvexShape {
        ConvexShape::Ball(Ball::new(radius), Point::origin())
    }

    #[test]
    fn approaching_balls_report_monotone_decreasing_toi_with_speed() {
        let a = ball_shape(1.0);
        let b = ball_shape(1.0);
        let start_a = Isometry::identity();
        let start_b = Isometry::from_parts(Translation::new(10.0, 0.0, 0.0), Default::default());

        let slow_end = Isometry::from_parts(Translation::new(3.0, 0.0, 0.0), Default::default());
        let fast_end = Isometry::from_parts(Translation::new(9.0, 0.0, 0.0), Default::default());

        let slow = time_of_impact(&a, start_a, slow_end, &b, start_b, start_b, 1.0e-3);
        let fast = time_of_impact(&a, start_a, fast_end, &b, start_b, start_b, 1.0e-3);

        let slow_toi = match slow {
            ToiStatus::Touching { toi, .. } => toi,
            other => panic!("expected a hit for the fast approach, got {:?}", other),
        };
        let fast_toi = match fast {
            ToiStatus::Touching { toi, .. } => toi,
            other => panic!("expected a hit for the fast approach, got {:?}", other),
        };
        assert!(fast_toi <= slow_toi);
    }

    #[test]
    fn never_approaching_balls_report_separated() {
        let a = ball_shape(1.0);
        let b = ball_shape(1.0);
        let start_a = Isometry::identity();
        let end_a = Isometry::from_parts(Translation::new(-5.0, 0.0, 0.0), Default::default());
        let start_b = Isometry::from_parts(Translation::new(10.0, 0.0, 0.0), Default::default());

        let status = time_of_impact(&a, start_a, end_a, &b, start_b, start_b, 1.0e-3);
        assert_eq!(status, ToiStatus::Separated);
    }
}
