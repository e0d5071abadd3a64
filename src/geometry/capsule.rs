use crate::geometry::aabb::Aabb;
use crate::math::{Isometry, Point, Real, Vector};
use std::f32::consts::PI;

/// A capsule: the Minkowski sum of a line segment and a ball, expressed in
/// local space by its two segment endpoints.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Capsule {
    pub a: Point,
    pub b: Point,
    pub radius: Real,
}

impl Capsule {
    pub fn new(a: Point, b: Point, radius: Real) -> Self {
        Self { a, b, radius }
    }

    pub fn segment(&self) -> (Point, Point) {
        (self.a, self.b)
    }

    pub fn half_length(&self) -> Real {
        (self.b - self.a).norm() * 0.5
    }

    pub fn transform_by(&self, iso: &Isometry) -> Capsule {
        Capsule {
            a: iso * self.a,
            b: iso * self.b,
            radius: self.radius,
        }
    }

    pub fn aabb(&self) -> Aabb {
        let r = Vector::new(self.radius, self.radius, self.radius);
        Aabb::new(self.a.inf(&self.b) - r, self.a.sup(&self.b) + r)
    }

    pub fn volume(&self) -> Real {
        let h = (self.b - self.a).norm();
        let sphere = (4.0 / 3.0) * PI * self.radius.powi(3);
        let cylinder = PI * self.radius * self.radius * h;
        sphere + cylinder
    }

    /// Capped-cylinder inertia about its own centroid, diagonal approximation
    /// (principal axes aligned with the segment) used before the
    /// orientation-dependent parallel-axis shift.
    pub fn local_inertia(&self, mass: Real) -> crate::utils::SdpMatrix3 {
        let h = (self.b - self.a).norm();
        let r = self.radius;
        let cyl_mass = mass * (PI * r * r * h) / self.volume().max(1.0e-8);
        let cap_mass = mass - cyl_mass;

        // Axial (around the segment direction).
        let i_axial = cyl_mass * r * r * 0.5 + cap_mass * 0.4 * r * r;
        // Transverse (perpendicular to the segment).
        let i_cyl_t = cyl_mass * (3.0 * r * r + h * h) / 12.0;
        let i_cap_t = cap_mass * (0.4 * r * r + 0.375 * r * h + 0.25 * h * h);
        let i_t = i_cyl_t + i_cap_t;

        // Local axis is along `b - a`; build about that direction by
        // rotating the diagonal (i_t, i_t, i_axial) tensor to align `z`
        // with the segment direction.
        let axis = (self.b - self.a)
            .try_normalize(crate::math::DEFAULT_EPSILON)
            .unwrap_or(Vector::z());
        let rot = nalgebra::Rotation3::rotation_between(&Vector::z(), &axis)
            .unwrap_or_else(nalgebra::Rotation3::identity);
        let diag = crate::math::Matrix3::from_diagonal(&Vector::new(i_t, i_t, i_axial));
        crate::utils::SdpMatrix3::from_sdp_matrix(rot.matrix() * diag * rot.matrix().transpose())
    }

    /// Closest point on the capsule's core segment to an arbitrary point.
    pub fn closest_point_on_segment(&self, p: Point) -> Point {
        closest_point_on_segment(self.a, self.b, p)
    }

    /// `support(direction)`: nearer segment endpoint, pushed out by
    /// `radius` along the direction.
    pub fn support_point(&self, direction: Vector) -> Point {
        let endpoint = if direction.dot(&(self.b - self.a)) >= 0.0 {
            self.b
        } else {
            self.a
        };
        let n = direction
            .try_normalize(crate::math::DEFAULT_EPSILON)
            .unwrap_or(Vector::z());
        endpoint + n * self.radius
    }
}

/// Closest point on segment `[a, b]` to `p`.
pub fn closest_point_on_segment(a: Point, b: Point, p: Point) -> Point {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < crate::math::DEFAULT_EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest pair of points between two segments `[a1, b1]` and `[a2, b2]`,
/// returning `(point_on_1, point_on_2)`. Standard clamped-parametric
/// solution; degenerates gracefully when either segment has zero length.
pub fn closest_points_segment_segment(a1: Point, b1: Point, a2: Point, b2: Point) -> (Point, Point) {
    let d1 = b1 - a1;
    let d2 = b2 - a2;
    let r = a1 - a2;
    let aa = d1.norm_squared();
    let ee = d2.norm_squared();
    let f = d2.dot(&r);

    let (mut s, mut t);
    if aa <= crate::math::DEFAULT_EPSILON && ee <= crate::math::DEFAULT_EPSILON {
        return (a1, a2);
    }
    if aa <= crate::math::DEFAULT_EPSILON {
        s = 0.0;
        t = (f / ee).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(&r);
        if ee <= crate::math::DEFAULT_EPSILON {
            t = 0.0;
            s = (-c / aa).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(&d2);
            let denom = aa * ee - b * b;
            s = if denom.abs() > crate::math::DEFAULT_EPSILON {
                ((b * f - c * ee) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            t = (b * s + f) / ee;
            if t < 0.0 {
                t = 0.0;
                s = (-c / aa).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / aa).clamp(0.0, 1.0);
            }
        }
    }
    (a1 + d1 * s, a2 + d2 * t)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn segment_segment_parallel_coincident_returns_any_valid_pair() {
        let (p1, p2) = closest_points_segment_segment(
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
        );
        assert!((p1.y - 0.0).abs() < 1.0e-4);
        assert!((p2.y - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn closest_point_on_segment_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(2.0, 0.0, 0.0);
        assert_eq!(closest_point_on_segment(a, b, Point::new(-5.0, 1.0, 0.0)), a);
        assert_eq!(closest_point_on_segment(a, b, Point::new(5.0, 1.0, 0.0)), b);
    }
}
