use crate::math::{Point, Real, Vector};

/// An axis-aligned bounding box, the only shape every other primitive and
/// every octree node is required to expose.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
}

impl Aabb {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// An AABB that contains nothing; the identity element of [`Aabb::merged`].
    pub fn invalid() -> Self {
        Self {
            min: Point::new(Real::MAX, Real::MAX, Real::MAX),
            max: Point::new(-Real::MAX, -Real::MAX, -Real::MAX),
        }
    }

    pub fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    pub fn center(&self) -> Point {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extents(&self) -> Vector {
        self.max - self.min
    }

    pub fn half_extents(&self) -> Vector {
        self.extents() * 0.5
    }

    /// Radius of the bounding sphere centered at [`Aabb::center`]; used by
    /// the broad-phase driver's `|delta_position|^2 / radius` CCD trigger.
    pub fn bounding_radius(&self) -> Real {
        self.half_extents().norm()
    }

    pub fn volume(&self) -> Real {
        let e = self.extents();
        (e.x * e.y * e.z).max(0.0)
    }

    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn merge(&mut self, other: &Aabb) {
        *self = self.merged(other);
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Octree's three-way classification of `other` relative to `self`:
    /// disjoint, overlapping, or fully contained. Matches `evaluate()` in
    /// the original `Octree::insert`.
    pub fn evaluate(&self, other: &Aabb) -> AabbRelation {
        if !self.intersects(other) {
            AabbRelation::Disjoint
        } else if self.contains(other) {
            AabbRelation::Contained
        } else {
            AabbRelation::Overlapping
        }
    }

    /// Expanded by `margin` on every side; used to build the swept AABB
    /// union of a body's previous and current bounds for continuous CD,
    /// and to give the broad phase some slack (`prediction_distance`).
    pub fn loosened(&self, margin: Real) -> Aabb {
        let m = Vector::new(margin, margin, margin);
        Aabb {
            min: self.min - m,
            max: self.max + m,
        }
    }

    pub fn translated(&self, v: Vector) -> Aabb {
        Aabb {
            min: self.min + v,
            max: self.max + v,
        }
    }
}

/// The result of testing one AABB against another for octree insertion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AabbRelation {
    Disjoint,
    Overlapping,
    Contained,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merge_is_commutative_and_contains_both() {
        let a = Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point::new(-1.0, 0.5, 0.5), Point::new(0.5, 2.0, 2.0));
        let m = a.merged(&b);
        assert!(m.contains(&a));
        assert!(m.contains(&b));
        assert_eq!(m, b.merged(&a));
    }

    #[test]
    fn evaluate_matches_contains_and_intersects() {
        let outer = Aabb::new(Point::new(-10.0, -10.0, -10.0), Point::new(10.0, 10.0, 10.0));
        let inner = Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let disjoint = Aabb::new(Point::new(20.0, 20.0, 20.0), Point::new(21.0, 21.0, 21.0));
        assert_eq!(outer.evaluate(&inner), AabbRelation::Contained);
        assert_eq!(outer.evaluate(&disjoint), AabbRelation::Disjoint);
        assert_eq!(inner.evaluate(&outer), AabbRelation::Overlapping);
    }
}
