use crate::geometry::aabb::Aabb;
use crate::math::{Point, Real, Vector};
use std::f32::consts::PI;

/// A sphere collider, in its own local frame (always centered at the
/// origin; placement comes from the owning collider's transform).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Ball {
    pub radius: Real,
}

impl Ball {
    pub fn new(radius: Real) -> Self {
        Self { radius }
    }

    pub fn aabb(&self, center: Point) -> Aabb {
        let r = Vector::new(self.radius, self.radius, self.radius);
        Aabb::new(center - r, center + r)
    }

    pub fn volume(&self) -> Real {
        (4.0 / 3.0) * PI * self.radius.powi(3)
    }

    /// Solid-sphere inertia about its own center, `2/5 m r^2` on the
    /// diagonal.
    pub fn local_inertia(&self, mass: Real) -> Real {
        0.4 * mass * self.radius * self.radius
    }

    /// `support(direction)`: `center + direction * radius / |direction|`.
    pub fn support_point(&self, center: Point, direction: Vector) -> Point {
        let n = direction.try_normalize(crate::math::DEFAULT_EPSILON).unwrap_or(Vector::z());
        center + n * self.radius
    }

    pub fn closest_point(&self, center: Point, point: Point) -> Point {
        self.support_point(center, point - center)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn support_point_lies_on_surface_along_direction() {
        let b = Ball::new(2.0);
        let c = Point::new(1.0, 2.0, 3.0);
        let d = Vector::new(1.0, 0.0, 0.0);
        let s = b.support_point(c, d);
        assert!(((s - c).norm() - 2.0).abs() < 1.0e-5);
        // The support point maximises dot(d, v) over every vertex on the
        // sphere; a few sampled surface points must score no higher.
        for sample_dir in [Vector::y(), Vector::z(), -Vector::x()] {
            let sample = c + sample_dir.normalize() * 2.0;
            assert!(d.dot(&(s - c)) >= d.dot(&(sample - c)) - 1.0e-4);
        }
    }
}
