mod half_edge;
mod quickhull;

pub use half_edge::{Face, HalfEdge, HalfEdgeMesh};
pub use quickhull::build_convex_hull;

use crate::geometry::aabb::Aabb;
use crate::math::{Isometry, Point, Real, Vector};

/// A convex polyhedron: the half-edge mesh plus its cached AABB.
///
/// Construction goes through [`ConvexHull::from_points`] (QuickHull) or
/// [`ConvexHull::from_polygons`] (exact topology, used for box/OBB
/// colliders promoted to hulls).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvexHull {
    pub mesh: HalfEdgeMesh,
}

impl ConvexHull {
    pub fn from_points(points: &[Point]) -> Option<Self> {
        Some(Self {
            mesh: build_convex_hull(points)?,
        })
    }

    pub fn from_polygons(vertices: Vec<Point>, polygons: &[Vec<u32>]) -> Self {
        Self {
            mesh: HalfEdgeMesh::from_polygons(vertices, polygons),
        }
    }

    pub fn cuboid(half_extents: Vector) -> Self {
        let e = half_extents;
        let v = vec![
            Point::new(-e.x, -e.y, -e.z),
            Point::new(e.x, -e.y, -e.z),
            Point::new(e.x, e.y, -e.z),
            Point::new(-e.x, e.y, -e.z),
            Point::new(-e.x, -e.y, e.z),
            Point::new(e.x, -e.y, e.z),
            Point::new(e.x, e.y, e.z),
            Point::new(-e.x, e.y, e.z),
        ];
        let polys = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![0, 4, 7, 3],
            vec![1, 2, 6, 5],
        ];
        Self::from_polygons(v, &polys)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.mesh.vertices
    }

    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::invalid();
        for v in &self.mesh.vertices {
            aabb.min = aabb.min.inf(v);
            aabb.max = aabb.max.sup(v);
        }
        aabb
    }

    pub fn support_point(&self, direction: Vector) -> Point {
        self.mesh.support_point(direction)
    }

    pub fn transform_by(&self, iso: &Isometry) -> ConvexHull {
        Self {
            mesh: HalfEdgeMesh {
                vertices: self.mesh.vertices.iter().map(|p| iso * p).collect(),
                half_edges: self.mesh.half_edges.clone(),
                faces: self
                    .mesh
                    .faces
                    .iter()
                    .map(|f| Face {
                        normal: iso.rotation * f.normal,
                        distance: (iso.rotation * f.normal).dot(&(iso * self.mesh.vertices[self.mesh.half_edges[f.edge as usize].origin as usize]).coords),
                        edge: f.edge,
                    })
                    .collect(),
            },
        }
    }

    pub fn closest_point(&self, p: Point) -> Point {
        // Closest point on the hull's boundary: the minimum over faces of
        // the clamped-to-face-loop projection. Used by sphere/capsule vs
        // hull narrow phase (§4.5) and by `contains`.
        let mut best = self.mesh.vertices[0];
        let mut best_dist = Real::MAX;
        for face_idx in 0..self.mesh.faces.len() as u32 {
            let verts = self.mesh.face_vertices(face_idx);
            let face = &self.mesh.faces[face_idx as usize];
            let planar = p - face.normal * face.plane_distance(p);
            let projected = if point_in_polygon(&verts, face.normal, planar) {
                planar
            } else {
                closest_point_on_polygon_boundary(&verts, planar)
            };
            let d = (projected - p).norm_squared();
            if d < best_dist {
                best_dist = d;
                best = projected;
            }
        }
        best
    }

    /// Is `p` inside the (solid) hull -- i.e. on the negative side of
    /// every face plane.
    pub fn contains_point(&self, p: Point) -> bool {
        self.mesh
            .faces
            .iter()
            .all(|f| f.plane_distance(p) <= crate::math::DEFAULT_EPSILON)
    }

    /// The face whose plane is closest to (most negative penetration for)
    /// a point already inside the hull; used to push spheres/capsules out
    /// of deep penetration.
    pub fn face_closest_to_interior_point(&self, p: Point) -> u32 {
        let mut best_face = 0u32;
        let mut best_dist = Real::MIN;
        for (i, f) in self.mesh.faces.iter().enumerate() {
            let d = f.plane_distance(p);
            if d > best_dist {
                best_dist = d;
                best_face = i as u32;
            }
        }
        best_face
    }

    /// Volume by summing signed tetrahedra from an interior reference
    /// point (the vertex centroid) to each face triangle fan.
    pub fn volume(&self) -> Real {
        let centroid: Point = nalgebra::center(
            &self.mesh.vertices[0],
            &self.mesh.vertices[self.mesh.vertices.len() - 1],
        );
        let mut vol = 0.0;
        for face_idx in 0..self.mesh.faces.len() as u32 {
            let verts = self.mesh.face_vertices(face_idx);
            for i in 1..verts.len() - 1 {
                vol += crate::utils::tetrahedron_volume(centroid, verts[0], verts[i], verts[i + 1]);
            }
        }
        vol.abs()
    }
}

fn point_in_polygon(verts: &[Point], normal: Vector, p: Point) -> bool {
    for i in 0..verts.len() {
        let a = verts[i];
        let b = verts[(i + 1) % verts.len()];
        let edge = b - a;
        let to_p = p - a;
        if normal.dot(&edge.cross(&to_p)) < -1.0e-4 {
            return false;
        }
    }
    true
}

fn closest_point_on_polygon_boundary(verts: &[Point], p: Point) -> Point {
    let mut best = verts[0];
    let mut best_dist = Real::MAX;
    for i in 0..verts.len() {
        let a = verts[i];
        let b = verts[(i + 1) % verts.len()];
        let c = crate::geometry::capsule::closest_point_on_segment(a, b, p);
        let d = (c - p).norm_squared();
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cuboid_contains_its_own_center() {
        let hull = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        assert!(hull.contains_point(Point::origin()));
        assert!(!hull.contains_point(Point::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn closest_point_on_face_is_the_perpendicular_projection() {
        let hull = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let p = Point::new(5.0, 0.0, 0.0);
        let c = hull.closest_point(p);
        assert!((c.x - 1.0).abs() < 1.0e-3);
        assert!(c.y.abs() < 1.0e-3 && c.z.abs() < 1.0e-3);
    }
}
