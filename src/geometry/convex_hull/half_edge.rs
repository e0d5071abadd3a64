use crate::math::{Point, Real, Vector};

/// One directed edge of a face loop, paired with its twin on the
/// neighbouring face across the same edge.
///
/// `duplicate` marks the half of each twin pair that edge-pair iteration
/// (SAT's "build a Minkowski face" test, §4.5) should skip so that each
/// undirected edge of the hull is only visited once.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct HalfEdge {
    /// Index of the vertex this half-edge originates from.
    pub origin: u32,
    /// Index of the half-edge running the opposite direction across the
    /// same edge, on the neighbouring face.
    pub twin: u32,
    /// Next half-edge around this edge's face loop.
    pub next: u32,
    /// Previous half-edge around this edge's face loop.
    pub prev: u32,
    /// Face this half-edge borders.
    pub face: u32,
    pub duplicate: bool,
}

/// A planar face: its outward normal, signed plane distance
/// (`dot(normal, any vertex on the face)`), and one half-edge of its loop.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    pub normal: Vector,
    pub distance: Real,
    /// One half-edge belonging to this face; walk `.next` to recover the
    /// whole loop.
    pub edge: u32,
}

impl Face {
    #[inline]
    pub fn plane_distance(&self, p: Point) -> Real {
        self.normal.dot(&p.coords) - self.distance
    }
}

/// A convex hull represented as vertices plus a half-edge mesh over its
/// boundary.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct HalfEdgeMesh {
    pub vertices: Vec<Point>,
    pub half_edges: Vec<HalfEdge>,
    pub faces: Vec<Face>,
}

impl HalfEdgeMesh {
    /// Builds a half-edge mesh directly from a closed polygon list, one
    /// `Vec<u32>` of (CCW, outward-facing) vertex indices per face. Used to
    /// turn an AABB/OBB's 6 quads into a convex hull without running
    /// QuickHull, and by tests that want exact, hand-specified topology.
    pub fn from_polygons(vertices: Vec<Point>, polygons: &[Vec<u32>]) -> Self {
        let mut mesh = HalfEdgeMesh {
            vertices,
            half_edges: Vec::new(),
            faces: Vec::new(),
        };

        // edge_of[(origin, dest)] -> half-edge index, to resolve twins.
        let mut edge_of = rustc_hash::FxHashMap::default();

        for poly in polygons {
            let n = poly.len() as u32;
            let first_edge = mesh.half_edges.len() as u32;
            for i in 0..n {
                let origin = poly[i as usize];
                let dest = poly[((i + 1) % n) as usize];
                let idx = first_edge + i;
                mesh.half_edges.push(HalfEdge {
                    origin,
                    twin: u32::MAX,
                    next: first_edge + (i + 1) % n,
                    prev: first_edge + (i + n - 1) % n,
                    face: mesh.faces.len() as u32,
                    duplicate: false,
                });
                edge_of.insert((origin, dest), idx);
            }

            let a = mesh.vertices[poly[0] as usize];
            let b = mesh.vertices[poly[1] as usize];
            let c = mesh.vertices[poly[2] as usize];
            let normal = (b - a)
                .cross(&(c - a))
                .try_normalize(crate::math::DEFAULT_EPSILON)
                .unwrap_or(Vector::y());
            mesh.faces.push(Face {
                normal,
                distance: normal.dot(&a.coords),
                edge: first_edge,
            });
        }

        for i in 0..mesh.half_edges.len() {
            let (origin, dest) = {
                let e = &mesh.half_edges[i];
                (e.origin, mesh.half_edges[e.next as usize].origin)
            };
            if let Some(&twin) = edge_of.get(&(dest, origin)) {
                mesh.half_edges[i].twin = twin;
                if i as u32 > twin {
                    mesh.half_edges[i].duplicate = true;
                }
            }
        }

        mesh
    }

    pub fn face_loop(&self, face: u32) -> impl Iterator<Item = &HalfEdge> + '_ {
        let start = self.faces[face as usize].edge;
        let mut current = Some(start);
        std::iter::from_fn(move || {
            let idx = current?;
            let e = &self.half_edges[idx as usize];
            current = if e.next == start { None } else { Some(e.next) };
            Some(e)
        })
    }

    pub fn face_vertices(&self, face: u32) -> Vec<Point> {
        self.face_loop(face)
            .map(|e| self.vertices[e.origin as usize])
            .collect()
    }

    /// Argmax over all hull vertices of `dot(direction, v)`.
    pub fn support_index(&self, direction: Vector) -> u32 {
        let mut best = 0u32;
        let mut best_dot = Real::MIN;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = direction.dot(&v.coords);
            if d > best_dot {
                best_dot = d;
                best = i as u32;
            }
        }
        best
    }

    pub fn support_point(&self, direction: Vector) -> Point {
        self.vertices[self.support_index(direction) as usize]
    }

    /// Iterate only the canonical half of every twin pair -- i.e. every
    /// undirected edge exactly once.
    pub fn undirected_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.half_edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.duplicate)
            .map(|(i, e)| (i as u32, e.twin))
    }

    /// Euler's formula check `V - E/2 + F == 2`, run once after QuickHull
    /// construction to reject a malformed mesh.
    pub fn satisfies_euler_formula(&self) -> bool {
        let v = self.vertices.len() as i64;
        let e = self.half_edges.len() as i64 / 2;
        let f = self.faces.len() as i64;
        v - e + f == 2
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cube() -> HalfEdgeMesh {
        let v = vec![
            Point::new(-1.0, -1.0, -1.0),
            Point::new(1.0, -1.0, -1.0),
            Point::new(1.0, 1.0, -1.0),
            Point::new(-1.0, 1.0, -1.0),
            Point::new(-1.0, -1.0, 1.0),
            Point::new(1.0, -1.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(-1.0, 1.0, 1.0),
        ];
        let polys = vec![
            vec![0, 3, 2, 1], // -z
            vec![4, 5, 6, 7], // +z
            vec![0, 1, 5, 4], // -y
            vec![2, 3, 7, 6], // +y
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
        ];
        HalfEdgeMesh::from_polygons(v, &polys)
    }

    #[test]
    fn cube_satisfies_euler_formula() {
        let mesh = cube();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.half_edges.len(), 24);
        assert_eq!(mesh.faces.len(), 6);
        assert!(mesh.satisfies_euler_formula());
    }

    #[test]
    fn every_edge_has_a_resolved_twin() {
        let mesh = cube();
        for e in &mesh.half_edges {
            assert_ne!(e.twin, u32::MAX);
        }
    }

    #[test]
    fn support_point_picks_extremal_corner() {
        let mesh = cube();
        let s = mesh.support_point(Vector::new(1.0, 1.0, 1.0));
        assert_eq!(s, Point::new(1.0, 1.0, 1.0));
    }
}
