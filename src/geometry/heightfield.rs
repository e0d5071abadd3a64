use crate::geometry::aabb::Aabb;
use crate::geometry::triangle::Triangle;
use crate::math::{Point, Real};

/// Parameters for a "bumpy" height field: a regular `nrows x ncols` grid
/// of sample heights spanning `(scale.x, scale.z)` in the horizontal
/// plane, with `scale.y` applied to the sampled heights.
#[derive(Clone, Debug)]
pub struct BumpyTerrainParameters {
    pub heights: Vec<Real>,
    pub nrows: usize,
    pub ncols: usize,
    pub scale: crate::math::Vector,
}

/// Parameters for a flat, infinite-in-extent terrain plane at `height`.
#[derive(Copy, Clone, Debug)]
pub struct FlatTerrainParameters {
    pub height: Real,
    pub half_extent: Real,
}

/// A regular-grid height field over `(x, z)`. Either a sampled grid or a
/// flat plane (represented as a degenerate 2x2 grid).
#[derive(Clone, Debug)]
pub struct HeightField {
    heights: Vec<Real>,
    nrows: usize,
    ncols: usize,
    scale: crate::math::Vector,
}

impl HeightField {
    pub fn bumpy(params: BumpyTerrainParameters) -> Self {
        assert!(params.nrows >= 2 && params.ncols >= 2, "height field grid must be at least 2x2");
        Self {
            heights: params.heights,
            nrows: params.nrows,
            ncols: params.ncols,
            scale: params.scale,
        }
    }

    pub fn flat(params: FlatTerrainParameters) -> Self {
        Self {
            heights: vec![params.height; 4],
            nrows: 2,
            ncols: 2,
            scale: crate::math::Vector::new(
                params.half_extent * 2.0,
                1.0,
                params.half_extent * 2.0,
            ),
        }
    }

    fn height_at(&self, row: usize, col: usize) -> Real {
        self.heights[row * self.ncols + col] * self.scale.y
    }

    fn cell_world_x(&self, col: usize) -> Real {
        (col as Real / (self.ncols - 1) as Real - 0.5) * self.scale.x
    }

    fn cell_world_z(&self, row: usize) -> Real {
        (row as Real / (self.nrows - 1) as Real - 0.5) * self.scale.z
    }

    pub fn aabb(&self) -> Aabb {
        let min_h = self.heights.iter().cloned().fold(Real::MAX, Real::min) * self.scale.y;
        let max_h = self.heights.iter().cloned().fold(Real::MIN, Real::max) * self.scale.y;
        Aabb::new(
            Point::new(-self.scale.x * 0.5, min_h, -self.scale.z * 0.5),
            Point::new(self.scale.x * 0.5, max_h, self.scale.z * 0.5),
        )
    }

    /// Covered `(row, col)` grid range, then emits the two triangles per
    /// cell that intersect `query` (§4.4).
    pub fn triangles_overlapped(&self, query: &Aabb) -> Vec<Triangle> {
        let half_x = self.scale.x * 0.5;
        let half_z = self.scale.z * 0.5;

        let col_of = |x: Real| -> Real { (x + half_x) / self.scale.x * (self.ncols - 1) as Real };
        let row_of = |z: Real| -> Real { (z + half_z) / self.scale.z * (self.nrows - 1) as Real };

        let col_min = (col_of(query.min.x).floor().max(0.0)) as usize;
        let col_max = (col_of(query.max.x).ceil().min((self.ncols - 2) as Real).max(0.0)) as usize;
        let row_min = (row_of(query.min.z).floor().max(0.0)) as usize;
        let row_max = (row_of(query.max.z).ceil().min((self.nrows - 2) as Real).max(0.0)) as usize;

        let mut tris = Vec::new();
        for row in row_min..=row_max.min(self.nrows.saturating_sub(2)) {
            for col in col_min..=col_max.min(self.ncols.saturating_sub(2)) {
                let x0 = self.cell_world_x(col);
                let x1 = self.cell_world_x(col + 1);
                let z0 = self.cell_world_z(row);
                let z1 = self.cell_world_z(row + 1);

                let p00 = Point::new(x0, self.height_at(row, col), z0);
                let p10 = Point::new(x1, self.height_at(row, col + 1), z0);
                let p01 = Point::new(x0, self.height_at(row + 1, col), z1);
                let p11 = Point::new(x1, self.height_at(row + 1, col + 1), z1);

                for t in [Triangle::new(p00, p10, p11), Triangle::new(p00, p11, p01)] {
                    if t.aabb().intersects(query) {
                        tris.push(t);
                    }
                }
            }
        }
        tris
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flat_terrain_returns_two_triangles_for_an_overlapping_query() {
        let hf = HeightField::flat(FlatTerrainParameters {
            height: 0.0,
            half_extent: 50.0,
        });
        let query = Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let tris = hf.triangles_overlapped(&query);
        assert_eq!(tris.len(), 2);
        for t in &tris {
            assert!(t.a.y.abs() < 1.0e-4);
        }
    }

    #[test]
    fn bumpy_terrain_samples_scaled_heights() {
        let hf = HeightField::bumpy(BumpyTerrainParameters {
            heights: vec![0.0, 0.0, 0.0, 1.0],
            nrows: 2,
            ncols: 2,
            scale: crate::math::Vector::new(10.0, 2.0, 10.0),
        });
        let aabb = hf.aabb();
        assert!((aabb.max.y - 2.0).abs() < 1.0e-4);
    }
}
