//! Core value types shared across the isoline pipeline.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A point in grid coordinates `(x, y)` — `x` is the column, `y` is the row.
///
/// Equality is defined up to a caller-supplied `epsilon`; [`PartialEq`] and
/// [`Hash`] instead use a fixed six-decimal quantization so that `Point` can
/// be used as a hash-map key inside the spatial index without threading a
/// tolerance through every lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in plain grid coordinates; no longitude wrap at
    /// this layer.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Quantize to six decimal places, the resolution used for hashing.
    fn quantized(&self) -> (i64, i64) {
        const SCALE: f64 = 1_000_000.0;
        ((self.x * SCALE).round() as i64, (self.y * SCALE).round() as i64)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.quantized() == other.quantized()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.quantized().hash(state);
    }
}

/// Diagnostic metadata attached to a segment for debugging only; never
/// consulted by the assembler or stitcher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentProvenance {
    pub row: usize,
    pub col: usize,
    pub case_index: u8,
}

/// An unordered pair of points at a given contour level.
///
/// Invariant: `|p1 - p2| > 0.1 * epsilon`, both endpoints lie on the
/// boundary of the originating cell. Construction is infallible here —
/// callers that can produce degenerate segments (CONREC) filter them before
/// emitting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
    pub level: f64,
    pub provenance: SegmentProvenance,
}

impl Segment {
    pub fn new(p1: Point, p2: Point, level: f64, provenance: SegmentProvenance) -> Self {
        Self {
            p1,
            p2,
            level,
            provenance,
        }
    }

    pub fn length(&self) -> f64 {
        self.p1.distance(&self.p2)
    }
}

/// How a [`Chain`]'s closure came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureOrigin {
    /// Head equals tail at output time without any forced edge.
    Natural,
    /// Caller requested polygonization and the endpoint gap was within
    /// `max_force_close_distance`.
    Forced,
    /// Closed as a side effect of cross-tile merging.
    Merged,
    /// Closed by the endpoint-snapping post-pass.
    PostMergeSnap,
    /// Not closed; emitted as a `LineString`.
    Open,
}

/// An ordered sequence of points on a single contour level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub points: Vec<Point>,
    pub level: f64,
    pub closure_origin: ClosureOrigin,
}

impl Chain {
    pub fn new(points: Vec<Point>, level: f64) -> Self {
        Self {
            points,
            level,
            closure_origin: ClosureOrigin::Open,
        }
    }

    /// A chain is closed iff it has at least 3 points and its endpoints
    /// coincide within `epsilon`.
    pub fn is_closed(&self, epsilon: f64) -> bool {
        self.points.len() >= 3
            && self
                .points
                .first()
                .zip(self.points.last())
                .map(|(a, b)| a.distance(b) < epsilon)
                .unwrap_or(false)
    }

    pub fn total_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }

    pub fn reversed(&self) -> Chain {
        let mut points = self.points.clone();
        points.reverse();
        Chain {
            points,
            level: self.level,
            closure_origin: self.closure_origin,
        }
    }
}

/// Counters for conditions the pipeline recovers from rather than aborting
/// on. Accumulated across a whole-grid pass or the lifetime of a
/// [`crate::tile::TileBuilder`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub skipped_segments: usize,
    pub forced_closures: usize,
    pub merges: usize,
    pub snapped_endpoints: usize,
    pub dropped_fragments: usize,
}

impl Diagnostics {
    pub fn merge(&mut self, other: &Diagnostics) {
        self.skipped_segments += other.skipped_segments;
        self.forced_closures += other.forced_closures;
        self.merges += other.merges;
        self.snapped_endpoints += other.snapped_endpoints;
        self.dropped_fragments += other.dropped_fragments;
    }
}
