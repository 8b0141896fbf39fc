//! Grid Preprocessor: pole normalization, antimeridian wrap, and
//! invalid-value cleanup, applied in that order.

use tracing::debug;

use crate::grid::Grid;

/// Normalize poles and the antimeridian seam, then replace any surviving
/// non-finite sample with 0. Returns a new grid of identical shape; the
/// input is left untouched.
pub fn preprocess(grid: &Grid) -> Grid {
    let mut out = grid.clone();
    normalize_poles(&mut out);
    wrap_antimeridian(&mut out);
    let replaced = out.sanitize_invalid();
    debug!(
        rows = out.rows(),
        cols = out.cols(),
        replaced_invalid = replaced,
        "preprocessed grid"
    );
    out
}

/// Replace the first and last row with the mean of their finite values.
/// A row with no finite value is left unchanged.
fn normalize_poles(grid: &mut Grid) {
    for r in [0, grid.rows() - 1] {
        if let Some(mean) = finite_mean(grid.row(r)) {
            for c in 0..grid.cols() {
                grid.set(r, c, mean);
            }
        }
    }
}

fn finite_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// For each row, average the two seam columns if both ends are finite; copy
/// whichever end is finite if only one is.
fn wrap_antimeridian(grid: &mut Grid) {
    let last_col = grid.cols() - 1;
    for r in 0..grid.rows() {
        let left = grid.get(r, 0);
        let right = grid.get(r, last_col);
        match (left.is_finite(), right.is_finite()) {
            (true, true) => {
                let avg = (left + right) / 2.0;
                grid.set(r, 0, avg);
                grid.set(r, last_col, avg);
            }
            (true, false) => grid.set(r, last_col, left),
            (false, true) => grid.set(r, 0, right),
            (false, false) => {}
        }
    }
}
