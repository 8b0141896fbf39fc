//! Tile Builder: incremental per-tile isoline extraction with by-value
//! boundary strips published to neighbors as tiles arrive, so two adjacent
//! tiles evaluate identical samples on their shared seam.
//!
//! A tile covering `tile_size` cells carries `tile_size + 1` sample points
//! in each dimension, so it is already self-sufficient out to its own box
//! edge; the point on a shared edge is supplied identically by both of the
//! tiles that border it. Boundary strips extend a cell's CONREC input a
//! further `strip_width` points *past* that edge — not to complete a
//! missing cell, but so a contour's local shape is evaluated against the
//! same neighboring samples regardless of which tile processes it first.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::chain::assemble;
use crate::clip::clip_polyline_to_box;
use crate::config::Options;
use crate::conrec;
use crate::error::Result;
use crate::feature::{chain_to_feature, finalize_closure, Feature};
use crate::grid::{BoundaryStrip, Grid, Side, TileKey};
use crate::preprocess::preprocess;
use crate::stitch::Stitcher;
use crate::types::{Chain, Diagnostics};

/// Incrementally extracts isolines tile by tile, stitching each tile's
/// chains against whichever of its four axis-aligned neighbors have already
/// arrived.
pub struct TileBuilder {
    opts: Options,
    levels: Vec<f64>,
    tiles: HashMap<TileKey, Grid>,
    strips: HashMap<(TileKey, Side), BoundaryStrip>,
    stitcher: Stitcher,
    diagnostics: Diagnostics,
}

impl TileBuilder {
    pub fn new(levels: Vec<f64>, opts: Options) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            levels,
            tiles: HashMap::new(),
            strips: HashMap::new(),
            stitcher: Stitcher::new(),
            diagnostics: Diagnostics::default(),
        })
    }

    /// Hand the builder one tile's raw samples.
    /// Returns the features this tile's chains have been merged into so
    /// far; later-arriving neighbors may extend or re-stitch the same
    /// underlying chains, which only [`Self::finalize`] settles for good.
    pub fn add_tile(&mut self, ti: i64, tj: i64, data: Vec<Vec<f64>>) -> Result<Vec<Feature>> {
        let key = TileKey::new(ti, tj);
        let mut grid = Grid::from_rows(data)?;
        let replaced = grid.sanitize_invalid();
        if replaced > 0 {
            warn!(ti, tj, replaced, "tile contained non-finite samples");
        }

        let w = self.opts.strip_width;
        self.strips
            .insert((key.neighbor(Side::Top), Side::Bottom), BoundaryStrip::top(&grid, w));
        self.strips
            .insert((key.neighbor(Side::Bottom), Side::Top), BoundaryStrip::bottom(&grid, w));
        self.strips
            .insert((key.neighbor(Side::Left), Side::Right), BoundaryStrip::left(&grid, w));
        self.strips
            .insert((key.neighbor(Side::Right), Side::Left), BoundaryStrip::right(&grid, w));
        self.tiles.insert(key, grid.clone());

        let top = self.strips.get(&(key, Side::Top));
        let bottom = self.strips.get(&(key, Side::Bottom));
        let left = self.strips.get(&(key, Side::Left));
        let right = self.strips.get(&(key, Side::Right));
        let (expanded, row_offset, col_offset) = expand_tile(&grid, top, bottom, left, right);

        debug!(
            ti,
            tj,
            expanded_rows = expanded.rows(),
            expanded_cols = expanded.cols(),
            "assembled bordered tile neighborhood"
        );

        let preprocessed = preprocess(&expanded);
        let segments = conrec::compute_segments(
            preprocessed.rows(),
            preprocessed.cols(),
            preprocessed.as_slice(),
            &self.levels,
            self.opts.epsilon,
        );
        // Closure forcing stays off for the per-tile pass: a chain that
        // happens to close within one tile's padded view is still subject
        // to re-opening and re-merging once a neighbor tile supplies the
        // samples on the other side of the seam.
        let (local_chains, assemble_diag) = assemble(&segments, self.opts.epsilon, self.opts.bucket_size);
        self.diagnostics.merge(&assemble_diag);

        let tile_size = self.opts.tile_size as f64;
        let min_x = tj as f64 * tile_size;
        let max_x = min_x + tile_size;
        let min_y = ti as f64 * tile_size;
        let max_y = min_y + tile_size;

        let mut clipped = Vec::new();
        for chain in local_chains {
            let lifted: Vec<_> = chain
                .points
                .iter()
                .map(|p| {
                    crate::types::Point::new(p.x - col_offset as f64 + min_x, p.y - row_offset as f64 + min_y)
                })
                .collect();
            for run in clip_polyline_to_box(&lifted, min_x, min_y, max_x, max_y) {
                if run.len() >= 2 {
                    clipped.push(Chain::new(run, chain.level));
                } else {
                    self.diagnostics.dropped_fragments += 1;
                }
            }
        }

        let stitched = self.stitcher.ingest(key, clipped, &self.opts, &mut self.diagnostics);
        Ok(stitched
            .into_iter()
            .map(|c| chain_to_feature(&c))
            .collect())
    }

    /// Run the global post-pass and apply the closure policy to whatever
    /// chains remain, producing the final feature set.
    pub fn finalize(&mut self) -> Vec<Feature> {
        let mut chains = self.stitcher.finalize_post_pass(&self.opts, &mut self.diagnostics);
        for chain in chains.iter_mut() {
            finalize_closure(chain, &self.opts, &mut self.diagnostics);
        }
        chains.into_iter().map(|c| chain_to_feature(&c)).collect()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// The raw samples stored for a tile that has already arrived, if any.
    pub fn tile(&self, ti: i64, tj: i64) -> Option<&Grid> {
        self.tiles.get(&TileKey::new(ti, tj))
    }
}

/// Assemble the bordered neighborhood CONREC runs over: the tile's own data
/// padded on each side by whatever strip has been published there so far.
/// A side with no published strip adds no padding. The
/// two perpendicular pads never see each other's originating neighbor tile
/// directly — the corner cells of the padding are filled by clamping the
/// adjoining strip's nearest row/column outward, which keeps the expanded
/// grid rectangular without requiring diagonal-neighbor data that the
/// stitcher's axis-aligned merge step never needs anyway.
fn expand_tile(
    grid: &Grid,
    top: Option<&BoundaryStrip>,
    bottom: Option<&BoundaryStrip>,
    left: Option<&BoundaryStrip>,
    right: Option<&BoundaryStrip>,
) -> (Grid, usize, usize) {
    let h = grid.rows();
    let cc = grid.cols();
    let top_pad = top.map_or(0, |s| s.width());
    let bottom_pad = bottom.map_or(0, |s| s.width());
    let left_pad = left.map_or(0, |s| s.width());
    let right_pad = right.map_or(0, |s| s.width());
    let new_rows = h + top_pad + bottom_pad;
    let new_cols = cc + left_pad + right_pad;

    let center_row = |i: usize| -> Vec<f64> {
        if i < top_pad {
            resize_row(&top.unwrap().lines[i], cc)
        } else if i < top_pad + h {
            grid.row(i - top_pad).to_vec()
        } else {
            resize_row(&bottom.unwrap().lines[i - top_pad - h], cc)
        }
    };
    let own_row_for = |i: usize| -> usize {
        if i < top_pad {
            0
        } else if i < top_pad + h {
            i - top_pad
        } else {
            h - 1
        }
    };
    let side_value = |strip: &BoundaryStrip, i: usize, k: usize| -> f64 {
        *strip.lines[k].get(own_row_for(i)).unwrap_or(&0.0)
    };

    let mut data = Vec::with_capacity(new_rows * new_cols);
    for i in 0..new_rows {
        if let Some(s) = left {
            for k in 0..left_pad {
                data.push(side_value(s, i, k));
            }
        }
        data.extend(center_row(i));
        if let Some(s) = right {
            for k in 0..right_pad {
                data.push(side_value(s, i, k));
            }
        }
    }
    let expanded = Grid::new(new_rows, new_cols, data).expect("expanded tile shape is always rectangular");
    (expanded, top_pad, left_pad)
}

fn resize_row(row: &[f64], target_len: usize) -> Vec<f64> {
    if row.len() == target_len {
        row.to_vec()
    } else if row.len() > target_len {
        row[..target_len].to_vec()
    } else {
        let mut out = row.to_vec();
        let last = *row.last().unwrap_or(&0.0);
        out.resize(target_len, last);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(rows: usize, cols: usize, v: f64) -> Vec<Vec<f64>> {
        vec![vec![v; cols]; rows]
    }

    #[test]
    fn single_tile_peak_closes_a_ring() {
        let mut builder = TileBuilder::new(vec![5.0], Options::default()).unwrap();
        let data = vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 10.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ];
        builder.add_tile(0, 0, data).unwrap();
        let features = builder.finalize();
        assert!(!features.is_empty());
    }

    #[test]
    fn flat_field_across_tiles_produces_nothing() {
        let mut builder = TileBuilder::new(vec![5.0], Options::default()).unwrap();
        builder.add_tile(0, 0, flat(4, 4, 1.0)).unwrap();
        builder.add_tile(0, 1, flat(4, 4, 1.0)).unwrap();
        let features = builder.finalize();
        assert!(features.is_empty());
    }

    #[test]
    fn adjacent_tiles_stitch_a_crossing_contour() {
        let mut opts = Options::default();
        opts.tile_size = 4;
        opts.strip_width = 2;
        let mut builder = TileBuilder::new(vec![5.0], opts).unwrap();
        // Each tile carries tile_size + 1 = 5 points per dimension, so its
        // own box edge (shared with its neighbor) is native data, not
        // something a strip needs to supply. Values vary only by row, so
        // both tiles independently extract the same two horizontal lines
        // (y=0.5 and y=3.5) terminating at the exact same point (x=4,
        // y=0.5/3.5) on their shared edge; the stitcher then joins them
        // into two contours spanning the full 8-wide domain.
        let row_values = [0.0, 10.0, 10.0, 10.0, 0.0];
        let make_tile = || -> Vec<Vec<f64>> { row_values.iter().map(|&v| vec![v; 5]).collect() };
        builder.add_tile(0, 0, make_tile()).unwrap();
        builder.add_tile(0, 1, make_tile()).unwrap();
        let features = builder.finalize();
        assert!(!features.is_empty());
        let max_x = features
            .iter()
            .flat_map(|f| match f {
                Feature::LineString { coordinates, .. } | Feature::Polygon { coordinates, .. } => {
                    coordinates.iter().map(|c| c[0])
                }
            })
            .fold(0.0_f64, f64::max);
        assert!(max_x > 7.0, "a stitched chain should reach into the right tile, got max_x={max_x}");
    }

    #[test]
    fn rejects_jagged_tile_data() {
        let mut builder = TileBuilder::new(vec![5.0], Options::default()).unwrap();
        let jagged = vec![vec![0.0, 1.0], vec![0.0]];
        assert!(builder.add_tile(0, 0, jagged).is_err());
    }
}
