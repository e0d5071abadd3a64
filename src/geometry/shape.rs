use crate::geometry::aabb::Aabb;
use crate::geometry::ball::Ball;
use crate::geometry::capsule::Capsule;
use crate::geometry::convex_hull::ConvexHull;
use crate::math::{Isometry, Point, Real, Vector};

/// The five collider kinds named in the data model (§3), plus compound
/// as the sixth administrative wrapper. `Compound` never itself
/// participates in narrow phase: the broad-phase dispatcher expands it
/// into its components before dispatching (§4.5).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    ConvexHull,
    Sphere,
    Capsule,
    Compound,
    TriangleMesh,
    HeightField,
}

/// One of the three *convex* primitive kinds a compound collider may be
/// built from, and the ones GJK/SAT/TOI operate on directly.
#[derive(Clone, Debug)]
pub enum ConvexShape {
    Ball(Ball, Point),
    Capsule(Capsule),
    Hull(ConvexHull),
}

impl ConvexShape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ConvexShape::Ball(..) => ShapeKind::Sphere,
            ConvexShape::Capsule(..) => ShapeKind::Capsule,
            ConvexShape::Hull(..) => ShapeKind::ConvexHull,
        }
    }

    /// `support(direction) -> point`: the vertex of the shape farthest
    /// along `direction` (§4.1). This is the only primitive GJK, SAT and
    /// TOI ever call.
    pub fn support_point(&self, direction: Vector) -> Point {
        match self {
            ConvexShape::Ball(ball, center) => ball.support_point(*center, direction),
            ConvexShape::Capsule(cap) => cap.support_point(direction),
            ConvexShape::Hull(hull) => hull.support_point(direction),
        }
    }

    pub fn aabb(&self) -> Aabb {
        match self {
            ConvexShape::Ball(ball, center) => ball.aabb(*center),
            ConvexShape::Capsule(cap) => cap.aabb(),
            ConvexShape::Hull(hull) => hull.aabb(),
        }
    }

    /// A conservative bounding radius about the shape's own centroid, used
    /// by the CCD trigger ratio `|delta_position|^2 / radius` (§4.7).
    pub fn bounding_radius(&self) -> Real {
        self.aabb().bounding_radius()
    }

    pub fn transform_by(&self, iso: &Isometry) -> ConvexShape {
        match self {
            ConvexShape::Ball(ball, center) => ConvexShape::Ball(*ball, iso * center),
            ConvexShape::Capsule(cap) => ConvexShape::Capsule(cap.transform_by(iso)),
            ConvexShape::Hull(hull) => ConvexShape::Hull(hull.transform_by(iso)),
        }
    }

    pub fn volume(&self) -> Real {
        match self {
            ConvexShape::Ball(ball, _) => ball.volume(),
            ConvexShape::Capsule(cap) => cap.volume(),
            ConvexShape::Hull(hull) => hull.volume(),
        }
    }

    pub fn closest_point(&self, p: Point) -> Point {
        match self {
            ConvexShape::Ball(ball, center) => ball.closest_point(*center, p),
            ConvexShape::Capsule(cap) => cap.closest_point_on_segment(p), // expanded by radius by callers
            ConvexShape::Hull(hull) => hull.closest_point(p),
        }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        match self {
            ConvexShape::Ball(ball, center) => (p - center).norm() <= ball.radius,
            ConvexShape::Capsule(cap) => {
                (p - cap.closest_point_on_segment(p)).norm() <= cap.radius
            }
            ConvexShape::Hull(hull) => hull.contains_point(p),
        }
    }
}

/// The full shape stored by a [`Collider`](crate::geometry::Collider),
/// including the two non-convex kinds that only ever appear as the second
/// element of a narrow-phase pair (§4.5) and the compound administrative
/// wrapper (§3).
#[derive(Clone, Debug)]
pub enum Shape {
    Convex(ConvexShape),
    TriangleMesh(crate::geometry::TriangleMesh),
    HeightField(crate::geometry::HeightField),
    /// Component collider ids making up a compound; the compound's own
    /// `Shape` is only ever queried for its AABB, never dispatched into
    /// narrow phase directly.
    Compound(Vec<crate::geometry::ColliderHandle>),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Convex(c) => c.kind(),
            Shape::TriangleMesh(_) => ShapeKind::TriangleMesh,
            Shape::HeightField(_) => ShapeKind::HeightField,
            Shape::Compound(_) => ShapeKind::Compound,
        }
    }

    pub fn as_convex(&self) -> Option<&ConvexShape> {
        match self {
            Shape::Convex(c) => Some(c),
            _ => None,
        }
    }
}
