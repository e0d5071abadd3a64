use crate::geometry::aabb::Aabb;
use crate::geometry::triangle::Triangle;
use crate::math::{Point, Real};

/// Minimum AABB extent along any axis before BVH subdivision stops (see
/// §4.4); below this, a node is a leaf regardless of triangle count.
const MIN_NODE_EXTENT: Real = 0.05;
const MAX_CHILDREN: usize = 8;

#[derive(Clone, Debug)]
struct BvhNode {
    aabb: Aabb,
    parent: Option<u32>,
    children: Vec<u32>,
    triangles: Vec<u32>,
}

/// An 8-way BVH over a fixed triangle soup, built once at construction
/// time. Queries return the (deduplicated) set of triangle indices whose
/// own AABB -- not necessarily the triangle itself -- overlaps the query
/// box; callers narrow further with exact triangle tests.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
    pub vertices: Vec<Point>,
    pub indices: Vec<[u32; 3]>,
    nodes: Vec<BvhNode>,
    root: u32,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Point>, indices: Vec<[u32; 3]>) -> Self {
        let mut mesh = TriangleMesh {
            vertices,
            indices,
            nodes: Vec::new(),
            root: 0,
        };
        mesh.build();
        mesh
    }

    pub fn triangle(&self, i: u32) -> Triangle {
        let [a, b, c] = self.indices[i as usize];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    pub fn aabb(&self) -> Aabb {
        self.nodes[self.root as usize].aabb
    }

    fn build(&mut self) {
        let mut root_aabb = Aabb::invalid();
        for idx in &self.indices {
            let t = Triangle::new(
                self.vertices[idx[0] as usize],
                self.vertices[idx[1] as usize],
                self.vertices[idx[2] as usize],
            );
            root_aabb.merge(&t.aabb());
        }

        let all_tris: Vec<u32> = (0..self.indices.len() as u32).collect();
        self.nodes.push(BvhNode {
            aabb: root_aabb,
            parent: None,
            children: Vec::new(),
            triangles: Vec::new(),
        });
        self.root = 0;
        self.subdivide(0, all_tris);
        self.cleanup();
    }

    fn subdivide(&mut self, node_idx: u32, tri_indices: Vec<u32>) {
        let aabb = self.nodes[node_idx as usize].aabb;
        let extents = aabb.extents();

        if tri_indices.len() <= MAX_CHILDREN
            || extents.x < MIN_NODE_EXTENT
            || extents.y < MIN_NODE_EXTENT
            || extents.z < MIN_NODE_EXTENT
        {
            self.nodes[node_idx as usize].triangles = tri_indices;
            return;
        }

        let center = aabb.center();
        let mut buckets: [Vec<u32>; 8] = Default::default();
        for &ti in &tri_indices {
            let t = self.triangle(ti);
            let tc = t.aabb().center();
            let octant = ((tc.x >= center.x) as usize)
                | (((tc.y >= center.y) as usize) << 1)
                | (((tc.z >= center.z) as usize) << 2);
            buckets[octant].push(ti);
        }

        for (octant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let child_aabb = octant_aabb(&aabb, center, octant);
            // Triangles only *intersecting* this octant AABB are inserted,
            // per §4.4 -- the bucket test above is a fast spatial
            // partition, but we still must verify actual AABB overlap
            // (triangles spanning the midplane can straddle several).
            let overlapping: Vec<u32> = tri_indices
                .iter()
                .copied()
                .filter(|&ti| self.triangle(ti).aabb().intersects(&child_aabb))
                .collect();
            if overlapping.is_empty() {
                continue;
            }

            let child_idx = self.nodes.len() as u32;
            self.nodes.push(BvhNode {
                aabb: child_aabb,
                parent: Some(node_idx),
                children: Vec::new(),
                triangles: Vec::new(),
            });
            self.nodes[node_idx as usize].children.push(child_idx);
            self.subdivide(child_idx, overlapping);
        }
    }

    /// Removes nodes with no triangles and no children, per §4.4's cleanup
    /// pass. Parent `children` lists are rewritten to drop dangling
    /// indices.
    fn cleanup(&mut self) {
        let mut keep = vec![true; self.nodes.len()];
        // Bottom-up: a node survives if it has triangles or a surviving
        // child.
        for i in (0..self.nodes.len()).rev() {
            let empty_leaf = self.nodes[i].triangles.is_empty() && self.nodes[i].children.is_empty();
            if empty_leaf && i as u32 != self.root {
                keep[i] = false;
            }
        }
        for node in &mut self.nodes {
            node.children.retain(|&c| keep[c as usize]);
        }
    }

    /// Union of triangle indices whose triangle actually intersects
    /// `query` (not merely their BVH leaf AABB).
    pub fn get_triangles_overlapped(&self, query: &Aabb) -> Vec<u32> {
        let mut out = std::collections::HashSet::new();
        self.query_node(self.root, query, &mut out);
        out.into_iter().collect()
    }

    fn query_node(&self, node_idx: u32, query: &Aabb, out: &mut std::collections::HashSet<u32>) {
        let node = &self.nodes[node_idx as usize];
        if !node.aabb.intersects(query) {
            return;
        }
        for &ti in &node.triangles {
            if self.triangle(ti).aabb().intersects(query) {
                out.insert(ti);
            }
        }
        for &child in &node.children {
            self.query_node(child, query, out);
        }
    }
}

fn octant_aabb(parent: &Aabb, center: Point, octant: usize) -> Aabb {
    let min = crate::math::Point::new(
        if octant & 1 != 0 { center.x } else { parent.min.x },
        if octant & 2 != 0 { center.y } else { parent.min.y },
        if octant & 4 != 0 { center.z } else { parent.min.z },
    );
    let max = crate::math::Point::new(
        if octant & 1 != 0 { parent.max.x } else { center.x },
        if octant & 2 != 0 { parent.max.y } else { center.y },
        if octant & 4 != 0 { parent.max.z } else { center.z },
    );
    Aabb::new(min, max)
}

#[cfg(test)]
mod test {
    use super::*;

    fn single_triangle_mesh() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn overlapped_triangles_contains_the_intersecting_one() {
        let mesh = single_triangle_mesh();
        let query = Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(2.0, 2.0, 1.0));
        assert_eq!(mesh.get_triangles_overlapped(&query), vec![0]);
    }

    #[test]
    fn no_overlap_returns_empty() {
        let mesh = single_triangle_mesh();
        let query = Aabb::new(Point::new(10.0, 10.0, 10.0), Point::new(11.0, 11.0, 11.0));
        assert!(mesh.get_triangles_overlapped(&query).is_empty());
    }
}
