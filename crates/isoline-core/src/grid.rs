//! The rectangular sample grid and its tiled / bordered counterparts:
//! `Grid`, `TileKey`, and `BoundaryStrip`.

use serde::{Deserialize, Serialize};

use crate::error::{IsolineError, Result};

/// A rectangular 2-D array of samples, stored row-major.
///
/// `rows, cols >= 2` is enforced at construction; everything downstream can
/// assume a well-formed grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Grid {
    /// Build a grid from row-major data, validating rectangularity and the
    /// `>= 2x2` minimum shape.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows < 2 || cols < 2 {
            return Err(IsolineError::invalid_shape(format!(
                "grid must be at least 2x2, got {rows}x{cols}"
            )));
        }
        if data.len() != rows * cols {
            return Err(IsolineError::invalid_shape(format!(
                "grid data length {} does not match {rows}x{cols}",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a grid from non-uniform row vectors, the shape tiles arrive in
    /// at `TileBuilder::add_tile`; validates rectangularity.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let row_count = rows.len();
        if row_count == 0 {
            return Err(IsolineError::invalid_shape("grid has zero rows"));
        }
        let col_count = rows[0].len();
        if rows.iter().any(|r| r.len() != col_count) {
            return Err(IsolineError::invalid_shape("jagged rows in tile data"));
        }
        let mut data = Vec::with_capacity(row_count * col_count);
        for row in rows {
            data.extend(row);
        }
        Self::new(row_count, col_count, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Replace every non-finite sample with 0.
    pub fn sanitize_invalid(&mut self) -> usize {
        let mut replaced = 0;
        for v in self.data.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
                replaced += 1;
            }
        }
        replaced
    }
}

/// Which side of a tile a [`BoundaryStrip`] was published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

/// A by-value copy of the raw samples within `width` cells of one side of a
/// tile. Strips are copied, not referenced, so that
/// neighboring tiles evaluate identical numeric inputs on their shared seam
/// even if the originating tile is later dropped from memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryStrip {
    pub side: Side,
    /// `width` rows (for Top/Bottom) or columns (for Left/Right), each a
    /// full-length vector of samples, ordered outward-to-inward for
    /// Top/Left and inward-to-outward for Bottom/Right is NOT assumed here:
    /// rows/cols are stored in the tile's own natural index order so the
    /// consumer can place them unambiguously.
    pub lines: Vec<Vec<f64>>,
}

impl BoundaryStrip {
    pub fn width(&self) -> usize {
        self.lines.len()
    }

    /// Extract the top `width` rows of `grid` as a strip published to the
    /// tile above.
    pub fn top(grid: &Grid, width: usize) -> Self {
        let width = width.min(grid.rows());
        let lines = (0..width).map(|r| grid.row(r).to_vec()).collect();
        Self {
            side: Side::Top,
            lines,
        }
    }

    pub fn bottom(grid: &Grid, width: usize) -> Self {
        let width = width.min(grid.rows());
        let start = grid.rows() - width;
        let lines = (start..grid.rows()).map(|r| grid.row(r).to_vec()).collect();
        Self {
            side: Side::Bottom,
            lines,
        }
    }

    pub fn left(grid: &Grid, width: usize) -> Self {
        let width = width.min(grid.cols());
        let lines = (0..width)
            .map(|c| (0..grid.rows()).map(|r| grid.get(r, c)).collect())
            .collect();
        Self {
            side: Side::Left,
            lines,
        }
    }

    pub fn right(grid: &Grid, width: usize) -> Self {
        let width = width.min(grid.cols());
        let start = grid.cols() - width;
        let lines = (start..grid.cols())
            .map(|c| (0..grid.rows()).map(|r| grid.get(r, c)).collect())
            .collect();
        Self {
            side: Side::Right,
            lines,
        }
    }
}

/// Integer tile coordinates, `(ti, tj)` — row-tile index, column-tile index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub ti: i64,
    pub tj: i64,
}

impl TileKey {
    pub fn new(ti: i64, tj: i64) -> Self {
        Self { ti, tj }
    }

    pub fn neighbor(&self, side: Side) -> TileKey {
        match side {
            Side::Top => TileKey::new(self.ti - 1, self.tj),
            Side::Bottom => TileKey::new(self.ti + 1, self.tj),
            Side::Left => TileKey::new(self.ti, self.tj - 1),
            Side::Right => TileKey::new(self.ti, self.tj + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_small_grid() {
        assert!(Grid::new(1, 1, vec![0.0]).is_err());
    }

    #[test]
    fn rejects_mismatched_length() {
        assert!(Grid::new(2, 2, vec![0.0, 1.0, 2.0]).is_err());
    }

    #[test]
    fn from_rows_rejects_jagged() {
        let rows = vec![vec![0.0, 1.0], vec![0.0]];
        assert!(Grid::from_rows(rows).is_err());
    }

    #[test]
    fn sanitize_replaces_non_finite() {
        let mut grid = Grid::new(2, 2, vec![0.0, f64::NAN, f64::INFINITY, 1.0]).unwrap();
        let n = grid.sanitize_invalid();
        assert_eq!(n, 2);
        assert_eq!(grid.get(0, 1), 0.0);
        assert_eq!(grid.get(1, 0), 0.0);
    }

    #[test]
    fn strip_extraction_matches_edges() {
        let grid = Grid::new(3, 4, (0..12).map(|v| v as f64).collect()).unwrap();
        let top = BoundaryStrip::top(&grid, 2);
        assert_eq!(top.lines, vec![vec![0.0, 1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0, 7.0]]);
        let left = BoundaryStrip::left(&grid, 1);
        assert_eq!(left.lines, vec![vec![0.0, 4.0, 8.0]]);
    }

    #[test]
    fn neighbor_keys_are_axis_aligned() {
        let key = TileKey::new(2, 3);
        assert_eq!(key.neighbor(Side::Top), TileKey::new(1, 3));
        assert_eq!(key.neighbor(Side::Bottom), TileKey::new(3, 3));
        assert_eq!(key.neighbor(Side::Left), TileKey::new(2, 2));
        assert_eq!(key.neighbor(Side::Right), TileKey::new(2, 4));
    }
}
