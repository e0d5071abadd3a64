use crate::geometry::aabb::Aabb;
use crate::math::{Point, Real, Vector};

/// A single triangle, as stored by a [`TriangleMesh`](crate::geometry::TriangleMesh)
/// or generated on the fly by a [`HeightField`](crate::geometry::HeightField).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub a: Point,
    pub b: Point,
    pub c: Point,
}

impl Triangle {
    pub fn new(a: Point, b: Point, c: Point) -> Self {
        Self { a, b, c }
    }

    pub fn normal(&self) -> Vector {
        (self.b - self.a)
            .cross(&(self.c - self.a))
            .try_normalize(crate::math::DEFAULT_EPSILON)
            .unwrap_or(Vector::y())
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.a.inf(&self.b).inf(&self.c),
            self.a.sup(&self.b).sup(&self.c),
        )
    }

    pub fn support_point(&self, direction: Vector) -> Point {
        let da = direction.dot(&self.a.coords);
        let db = direction.dot(&self.b.coords);
        let dc = direction.dot(&self.c.coords);
        if da >= db && da >= dc {
            self.a
        } else if db >= dc {
            self.b
        } else {
            self.c
        }
    }

    /// True if `p`'s projection onto the triangle's plane lies inside the
    /// triangle, using the edge-sign / barycentric test.
    pub fn contains_projected(&self, p: Point) -> bool {
        let v0 = self.c - self.a;
        let v1 = self.b - self.a;
        let v2 = p - self.a;

        let dot00 = v0.dot(&v0);
        let dot01 = v0.dot(&v1);
        let dot02 = v0.dot(&v2);
        let dot11 = v1.dot(&v1);
        let dot12 = v1.dot(&v2);

        let denom = dot00 * dot11 - dot01 * dot01;
        if denom.abs() < crate::math::DEFAULT_EPSILON {
            return false;
        }
        let inv_denom = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
        let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;
        u >= -1.0e-4 && v >= -1.0e-4 && (u + v) <= 1.0 + 1.0e-4
    }

    /// Closest point on the (solid) triangle to `p`; classic Ericson
    /// region-based projection.
    pub fn closest_point(&self, p: Point) -> Point {
        let ab = self.b - self.a;
        let ac = self.c - self.a;
        let ap = p - self.a;

        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.a;
        }

        let bp = p - self.b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return self.b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return self.a + ab * v;
        }

        let cp = p - self.c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return self.c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.a + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.b + (self.c - self.b) * w;
        }

        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        self.a + ab * v + ac * w
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn closest_point_on_plane_inside_triangle_is_the_projection() {
        let t = Triangle::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        );
        let p = Point::new(0.5, 0.5, 1.0);
        let c = t.closest_point(p);
        assert!((c.x - 0.5).abs() < 1.0e-4);
        assert!((c.y - 0.5).abs() < 1.0e-4);
        assert!(c.z.abs() < 1.0e-4);
    }

    #[test]
    fn closest_point_outside_clamps_to_nearest_vertex() {
        let t = Triangle::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
        );
        let c = t.closest_point(Point::new(-5.0, -5.0, 0.0));
        assert_eq!(c, t.a);
    }
}
