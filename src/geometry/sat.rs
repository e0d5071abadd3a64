//! Separating Axis Theorem overlap test over convex-hull face normals and
//! edge cross-products (§4.2), used as the `SAT <-> GJK parity` cross-check
//! in the test suite and, with [`SatQuery`], as the initial separating
//! axis for hull-vs-hull manifold generation (§4.5).

use crate::geometry::convex_hull::ConvexHull;
use crate::math::{Real, Vector};

/// Which hull contributed the best (least-penetrating) separating axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AxisSource {
    FaceOfA(u32),
    FaceOfB(u32),
    EdgeEdge,
}

/// Result of a full SAT query: the least-penetrating axis found, oriented
/// from hull A toward hull B, and the (possibly negative) separation along
/// it. A positive separation means the hulls are disjoint along this axis
/// alone, which is already proof they don't overlap at all.
#[derive(Copy, Clone, Debug)]
pub struct SatQuery {
    pub axis: Vector,
    pub separation: Real,
    pub source: AxisSource,
}

/// Cheap overlap-only SAT test: stops at the first separating axis found.
/// Matches GJK's overlap verdict bit-for-bit on well-conditioned input
/// (§8 `SAT <-> GJK parity`).
pub fn sat_overlap(a: &ConvexHull, b: &ConvexHull) -> bool {
    query_separating_axis(a, b).map_or(true, |q| q.separation <= 0.0)
}

/// Runs the full three-pass SAT query (A's faces, B's faces, edge-edge
/// cross products) and returns the single best (most separating, or least
/// penetrating if none separates) axis.
pub fn query_separating_axis(a: &ConvexHull, b: &ConvexHull) -> Option<SatQuery> {
    let mut best: Option<SatQuery> = None;
    let mut consider = |candidate: SatQuery| {
        if best.map_or(true, |b| candidate.separation > b.separation) {
            best = Some(candidate);
        }
    };

    for (i, face) in a.mesh.faces.iter().enumerate() {
        if face.distance.is_nan() {
            continue; // dead face left behind by coplanar-face merging
        }
        let deepest = b.support_point(-face.normal);
        let separation = face.normal.dot(&deepest.coords) - face.distance;
        consider(SatQuery {
            axis: face.normal,
            separation,
            source: AxisSource::FaceOfA(i as u32),
        });
        if separation > 0.0 {
            return Some(SatQuery {
                axis: face.normal,
                separation,
                source: AxisSource::FaceOfA(i as u32),
            });
        }
    }

    for (i, face) in b.mesh.faces.iter().enumerate() {
        if face.distance.is_nan() {
            continue;
        }
        let deepest = a.support_point(-face.normal);
        let separation = face.normal.dot(&deepest.coords) - face.distance;
        consider(SatQuery {
            axis: -face.normal,
            separation,
            source: AxisSource::FaceOfB(i as u32),
        });
        if separation > 0.0 {
            return Some(SatQuery {
                axis: -face.normal,
                separation,
                source: AxisSource::FaceOfB(i as u32),
            });
        }
    }

    let centroid_a = hull_centroid(a);
    let centroid_b = hull_centroid(b);

    for (ea_idx, ea_twin) in a.mesh.undirected_edges() {
        let ea = &a.mesh.half_edges[ea_idx as usize];
        let pa = a.mesh.vertices[ea.origin as usize];
        let qa = a.mesh.vertices[a.mesh.half_edges[ea_twin as usize].origin as usize];
        let dir_a = qa - pa;
        if dir_a.norm_squared() < crate::math::DEFAULT_EPSILON {
            continue;
        }

        for (eb_idx, eb_twin) in b.mesh.undirected_edges() {
            let eb = &b.mesh.half_edges[eb_idx as usize];
            let pb = b.mesh.vertices[eb.origin as usize];
            let qb = b.mesh.vertices[b.mesh.half_edges[eb_twin as usize].origin as usize];
            let dir_b = qb - pb;
            if dir_b.norm_squared() < crate::math::DEFAULT_EPSILON {
                continue;
            }

            let mut axis = dir_a.cross(&dir_b);
            let len = axis.norm();
            if len < crate::math::DEFAULT_EPSILON {
                continue; // parallel edges never produce a useful axis
            }
            axis /= len;
            if axis.dot(&(centroid_b - centroid_a)) < 0.0 {
                axis = -axis;
            }

            let support_a = a.support_point(-axis);
            let support_b = b.support_point(axis);
            let separation = axis.dot(&(support_a.coords - support_b.coords));
            consider(SatQuery {
                axis,
                separation,
                source: AxisSource::EdgeEdge,
            });
            if separation > 0.0 {
                return Some(SatQuery {
                    axis,
                    separation,
                    source: AxisSource::EdgeEdge,
                });
            }
        }
    }

    best
}

fn hull_centroid(hull: &ConvexHull) -> crate::math::Point {
    let verts = &hull.mesh.vertices;
    if verts.is_empty() {
        return crate::math::Point::origin();
    }
    let sum: Vector = verts.iter().map(|p| p.coords).sum();
    (sum / verts.len() as Real).into()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{Isometry, Translation};

    #[test]
    fn overlapping_cubes_report_overlap() {
        let a = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let b = a.transform_by(&Isometry::from_parts(
            Translation::new(0.5, 0.0, 0.0),
            Default::default(),
        ));
        assert!(sat_overlap(&a, &b));
    }

    #[test]
    fn separated_cubes_report_no_overlap() {
        let a = ConvexHull::cuboid(Vector::new(1.0, 1.0, 1.0));
        let b = a.transform_by(&Isometry::from_parts(
            Translation::new(5.0, 0.0, 0.0),
            Default::default(),
        ));
        assert!(!sat_overlap(&a, &b));
    }
}
