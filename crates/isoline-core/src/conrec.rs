//! CONREC: grid cell -> segments at given levels, via four-triangle
//! decomposition around the cell center.
//!
//! Each cell is split into four triangles sharing the cell-center value,
//! which resolves the classical saddle-point ambiguity deterministically
//! instead of relying on the 16-case marching-squares lookup table and its
//! tie-breaking heuristics.

use rayon::prelude::*;

use crate::types::{Point, Segment, SegmentProvenance};

/// A vertex's relation to the contour level, within `epsilon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Below,
    On,
    Above,
}

fn classify(value: f64, level: f64, epsilon: f64) -> Side {
    if (value - level).abs() <= epsilon {
        Side::On
    } else if value < level {
        Side::Below
    } else {
        Side::Above
    }
}

/// Linear interpolation along the edge `a -> b` for the crossing of
/// `level`; returns `a` unchanged if the two values are within `epsilon`.
fn interpolate_edge(a: (Point, f64), b: (Point, f64), level: f64, epsilon: f64) -> Point {
    let (pa, za) = a;
    let (pb, zb) = b;
    if (za - zb).abs() < epsilon {
        return pa;
    }
    let t = ((level - za) / (zb - za)).clamp(0.0, 1.0);
    Point::new(pa.x + t * (pb.x - pa.x), pa.y + t * (pb.y - pa.y))
}

/// Classify a triangle's three vertices and emit at most one crossing
/// segment, per the ten-case classification below.
fn triangle_segment(
    vertices: [(Point, f64); 3],
    level: f64,
    epsilon: f64,
) -> Option<(Point, Point)> {
    let sides: Vec<Side> = vertices.iter().map(|(_, v)| classify(*v, level, epsilon)).collect();
    let on: Vec<usize> = (0..3).filter(|&i| sides[i] == Side::On).collect();

    match on.len() {
        3 => None, // all three on: ambiguous, ignored
        2 => {
            let a = vertices[on[0]].0;
            let b = vertices[on[1]].0;
            Some((a, b))
        }
        1 => {
            let others: Vec<usize> = (0..3).filter(|i| !on.contains(i)).collect();
            let (i, j) = (others[0], others[1]);
            if sides[i] == sides[j] {
                None // touches the level at one corner, does not cross
            } else {
                let on_point = vertices[on[0]].0;
                let crossing = interpolate_edge(vertices[i], vertices[j], level, epsilon);
                Some((on_point, crossing))
            }
        }
        0 => {
            let below: Vec<usize> = (0..3).filter(|&i| sides[i] == Side::Below).collect();
            let above: Vec<usize> = (0..3).filter(|&i| sides[i] == Side::Above).collect();
            if below.len() == 3 || above.len() == 3 {
                return None;
            }
            // The minority vertex differs in class from both majority
            // vertices, so exactly those two edges cross `level`.
            let (minority, majority) = if below.len() == 1 {
                (below[0], above)
            } else {
                (above[0], below)
            };
            let p1 = interpolate_edge(vertices[minority], vertices[majority[0]], level, epsilon);
            let p2 = interpolate_edge(vertices[minority], vertices[majority[1]], level, epsilon);
            Some((p1, p2))
        }
        _ => unreachable!(),
    }
}

/// The classical 4-bit marching-squares case index, retained only as
/// diagnostic provenance (see GLOSSARY: "Case index").
fn case_index(z0: f64, z1: f64, z2: f64, z3: f64, level: f64) -> u8 {
    let mut idx = 0u8;
    if z0 >= level {
        idx |= 1;
    }
    if z1 >= level {
        idx |= 2;
    }
    if z2 >= level {
        idx |= 4;
    }
    if z3 >= level {
        idx |= 8;
    }
    idx
}

/// Extract all segments for a single cell at a single level, in
/// triangle order 1..4: `(c0,c1,cc)`, `(c1,c2,cc)`, `(c2,c3,cc)`, `(c3,c0,cc)`.
fn cell_segments(
    row: usize,
    col: usize,
    corners: [f64; 4],
    level: f64,
    epsilon: f64,
) -> Vec<Segment> {
    let [z0, z1, z2, z3] = corners;
    let c0 = Point::new(col as f64, row as f64);
    let c1 = Point::new(col as f64 + 1.0, row as f64);
    let c2 = Point::new(col as f64 + 1.0, row as f64 + 1.0);
    let c3 = Point::new(col as f64, row as f64 + 1.0);
    let zc = (z0 + z1 + z2 + z3) / 4.0;
    let cc = Point::new(col as f64 + 0.5, row as f64 + 0.5);

    let triangles = [
        [(c0, z0), (c1, z1), (cc, zc)],
        [(c1, z1), (c2, z2), (cc, zc)],
        [(c2, z2), (c3, z3), (cc, zc)],
        [(c3, z3), (c0, z0), (cc, zc)],
    ];

    let case = case_index(z0, z1, z2, z3, level);
    let mut segments = Vec::new();
    for (i, tri) in triangles.into_iter().enumerate() {
        if let Some((p1, p2)) = triangle_segment(tri, level, epsilon) {
            if p1.distance(&p2) > 0.1 * epsilon {
                segments.push(Segment::new(
                    p1,
                    p2,
                    level,
                    SegmentProvenance {
                        row,
                        col,
                        case_index: case | ((i as u8) << 4),
                    },
                ));
            }
        }
    }
    segments
}

/// Extract every segment for every level from `grid`.
///
/// Output order is deterministic: segments for a given level are emitted
/// row-major over cells and triangle 1..4 within each cell. Levels
/// themselves may run in parallel; the per-level batches are concatenated
/// back in caller-supplied level order so the overall result does not
/// depend on thread count.
pub fn compute_segments(rows: usize, cols: usize, data: &[f64], levels: &[f64], epsilon: f64) -> Vec<Segment> {
    if rows < 2 || cols < 2 || levels.is_empty() || data.len() != rows * cols {
        return Vec::new();
    }

    let corners_at = |r: usize, c: usize| -> [f64; 4] {
        [
            data[r * cols + c],
            data[r * cols + c + 1],
            data[(r + 1) * cols + c + 1],
            data[(r + 1) * cols + c],
        ]
    };

    let per_level: Vec<Vec<Segment>> = levels
        .par_iter()
        .map(|&level| {
            let mut out = Vec::new();
            for r in 0..rows - 1 {
                for c in 0..cols - 1 {
                    out.extend(cell_segments(r, c, corners_at(r, c), level, epsilon));
                }
            }
            out
        })
        .collect();

    per_level.into_iter().flatten().collect()
}
