//! Chain Assembler and the optional Glue-U post-pass.
//!
//! Joins the unordered short segments emitted by CONREC into maximal
//! polylines per contour level, using the spatial index and tolerance-based
//! endpoint matching.

use rayon::prelude::*;
use std::collections::HashMap;

use crate::spatial_index::SpatialIndex;
use crate::types::{Chain, ClosureOrigin, Diagnostics, Point, Segment};

/// Which end of a chain an endpoint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum End {
    Head,
    Tail,
}

/// Orient `a` and `b` so `a_end`/`b_end` become the join point, concatenate,
/// and drop the duplicated join vertex. Chain assembly and the cross-tile
/// stitcher's merge both reduce to this same join operation.
pub(crate) fn merge_chains(a: &Chain, a_end: End, b: &Chain, b_end: End) -> Chain {
    let a_oriented = if a_end == End::Head { a.reversed() } else { a.clone() };
    let b_oriented = if b_end == End::Tail { b.reversed() } else { b.clone() };

    let mut points = a_oriented.points;
    points.extend(b_oriented.points.into_iter().skip(1));
    Chain {
        points,
        level: a.level,
        closure_origin: ClosureOrigin::Open,
    }
}

fn is_valid_segment(seg: &Segment, epsilon: f64) -> bool {
    seg.p1.x.is_finite()
        && seg.p1.y.is_finite()
        && seg.p2.x.is_finite()
        && seg.p2.y.is_finite()
        && seg.p1.distance(&seg.p2) > 0.1 * epsilon
}

/// Group segments by level, preserving the order in which each level's
/// first segment was encountered (matching CONREC's per-level output
/// batches).
fn group_by_level(segments: &[Segment]) -> Vec<(f64, Vec<Segment>)> {
    let mut order: Vec<u64> = Vec::new();
    let mut groups: HashMap<u64, Vec<Segment>> = HashMap::new();
    for seg in segments {
        let bits = seg.level.to_bits();
        groups.entry(bits).or_insert_with(|| {
            order.push(bits);
            Vec::new()
        });
        groups.get_mut(&bits).unwrap().push(*seg);
    }
    order
        .into_iter()
        .map(|bits| (f64::from_bits(bits), groups.remove(&bits).unwrap()))
        .collect()
}

/// Assemble the segments of a single level into chains. `consumed_out`, if
/// given, receives which of `segments` ended up used so callers tracking
/// cross-level bookkeeping can inspect it; most callers can ignore it.
fn assemble_one_level(segments: &[Segment], epsilon: f64, bucket_size: f64) -> (Vec<Chain>, Diagnostics) {
    let mut diagnostics = Diagnostics::default();
    let valid: Vec<Segment> = segments
        .iter()
        .filter(|s| {
            let ok = is_valid_segment(s, epsilon);
            if !ok {
                diagnostics.skipped_segments += 1;
            }
            ok
        })
        .copied()
        .collect();

    if valid.is_empty() {
        return (Vec::new(), diagnostics);
    }

    let index = SpatialIndex::build(&valid, bucket_size);
    let mut consumed = vec![false; valid.len()];
    let max_iterations = 2 * valid.len();
    let mut chains = Vec::new();

    for seed in 0..valid.len() {
        if consumed[seed] {
            continue;
        }
        consumed[seed] = true;
        let seg = valid[seed];
        let mut points = vec![seg.p1, seg.p2];
        let mut closed = false;
        let mut iterations = 0usize;

        // Extend the tail (append at the end).
        while iterations < max_iterations {
            iterations += 1;
            if chain_closes(&points, epsilon) {
                closed = true;
                break;
            }
            let tip = *points.last().unwrap();
            let prev = points[points.len() - 2];
            match pick_extension(&index, &valid, &consumed, tip, prev, epsilon) {
                Some((idx, far)) => {
                    points.push(far);
                    consumed[idx] = true;
                }
                None => break,
            }
        }

        // Extend the head (prepend at the front), symmetric to the above.
        while !closed && iterations < max_iterations {
            iterations += 1;
            if chain_closes(&points, epsilon) {
                closed = true;
                break;
            }
            let tip = points[0];
            let prev = points[1];
            match pick_extension(&index, &valid, &consumed, tip, prev, epsilon) {
                Some((idx, far)) => {
                    points.insert(0, far);
                    consumed[idx] = true;
                }
                None => break,
            }
        }

        if points.len() >= 2 {
            chains.push(Chain::new(points, seg.level));
        }
    }

    (chains, diagnostics)
}

fn chain_closes(points: &[Point], epsilon: f64) -> bool {
    points.len() >= 3
        && points
            .first()
            .zip(points.last())
            .map(|(a, b)| a.distance(b) < epsilon)
            .unwrap_or(false)
}

/// Pick the unconsumed neighbor of `tip` whose far endpoint maximizes the
/// distance from `prev` — the "straightest continuation" heuristic of spec
/// §4.4 step 4. Ties go to whichever candidate `find_neighbors` returned
/// first.
fn pick_extension(
    index: &SpatialIndex,
    segments: &[Segment],
    consumed: &[bool],
    tip: Point,
    prev: Point,
    epsilon: f64,
) -> Option<(usize, Point)> {
    let mut best: Option<(usize, Point, f64)> = None;
    for idx in index.find_neighbors(tip, epsilon, segments) {
        if consumed[idx] {
            continue;
        }
        let seg = segments[idx];
        let far = if seg.p1.distance(&tip) <= epsilon {
            seg.p2
        } else {
            seg.p1
        };
        let score = far.distance(&prev);
        if best.map_or(true, |(_, _, best_score)| score > best_score) {
            best = Some((idx, far, score));
        }
    }
    best.map(|(idx, far, _)| (idx, far))
}

/// Assemble all segments (of any number of levels) into chains. Levels run
/// independently and may fan out in parallel; the per-level results are
/// concatenated back in the order levels were first encountered so output
/// does not depend on thread count.
pub fn assemble(segments: &[Segment], epsilon: f64, bucket_size: f64) -> (Vec<Chain>, Diagnostics) {
    let groups = group_by_level(segments);
    let results: Vec<(Vec<Chain>, Diagnostics)> = groups
        .par_iter()
        .map(|(_, group)| assemble_one_level(group, epsilon, bucket_size))
        .collect();

    let mut chains = Vec::new();
    let mut diagnostics = Diagnostics::default();
    for (level_chains, level_diag) in results {
        chains.extend(level_chains);
        diagnostics.merge(&level_diag);
    }
    (chains, diagnostics)
}

/// Glue-U: merge open chains within `mu` of each other into longer chains
/// or closed rings. Only invoked when the caller wants closed rings (i.e.
/// `force_polygon_closure`, see DESIGN.md).
pub fn glue_u(chains: Vec<Chain>, mu: f64, epsilon: f64, diagnostics: &mut Diagnostics) -> Vec<Chain> {
    let (mut closed, mut open): (Vec<Chain>, Vec<Chain>) =
        chains.into_iter().partition(|c| c.is_closed(epsilon));

    // Generous but finite bound: each successful merge removes one chain
    // from `open`, so the number of merge attempts is bounded by the
    // square of the starting count plus a small constant for failed probes.
    let max_attempts = open.len().saturating_mul(open.len()) + 16;
    let mut attempts = 0usize;
    let mut settled = Vec::new();

    while let Some(current) = open.pop() {
        attempts += 1;
        if attempts > max_attempts {
            settled.push(current);
            break;
        }

        let mut best: Option<(usize, f64, End, End)> = None;
        for (idx, cand) in open.iter().enumerate() {
            if (cand.level - current.level).abs() > epsilon {
                continue;
            }
            let current_ends = [
                (End::Head, current.points[0]),
                (End::Tail, *current.points.last().unwrap()),
            ];
            let cand_ends = [
                (End::Head, cand.points[0]),
                (End::Tail, *cand.points.last().unwrap()),
            ];
            for (ca, pa) in current_ends {
                for (cb, pb) in cand_ends {
                    let d = pa.distance(&pb);
                    if d <= mu && best.map_or(true, |(_, bd, _, _)| d < bd) {
                        best = Some((idx, d, ca, cb));
                    }
                }
            }
        }

        match best {
            None => settled.push(current),
            Some((idx, _, a_end, b_end)) => {
                let other = open.remove(idx);
                let mut merged = merge_chains(&current, a_end, &other, b_end);
                diagnostics.merges += 1;
                if merged.is_closed(epsilon) {
                    merged.closure_origin = ClosureOrigin::Merged;
                    closed.push(merged);
                } else {
                    open.push(merged);
                }
            }
        }
    }

    settled.extend(open);
    closed.extend(settled);
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SegmentProvenance;

    const EPS: f64 = 1e-4;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64, level: f64) -> Segment {
        Segment::new(
            Point::new(x1, y1),
            Point::new(x2, y2),
            level,
            SegmentProvenance { row: 0, col: 0, case_index: 0 },
        )
    }

    #[test]
    fn chains_segments_into_one_polyline() {
        let segments = vec![
            seg(0.0, 0.0, 1.0, 0.0, 1.0),
            seg(1.0, 0.0, 2.0, 0.0, 1.0),
            seg(2.0, 0.0, 3.0, 0.0, 1.0),
        ];
        let (chains, diag) = assemble(&segments, EPS, 1.0);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].points.len(), 4);
        assert_eq!(diag.skipped_segments, 0);
    }

    #[test]
    fn closes_a_ring() {
        let segments = vec![
            seg(0.0, 0.0, 1.0, 0.0, 1.0),
            seg(1.0, 0.0, 1.0, 1.0, 1.0),
            seg(1.0, 1.0, 0.0, 1.0, 1.0),
            seg(0.0, 1.0, 0.0, 0.0, 1.0),
        ];
        let (chains, _) = assemble(&segments, EPS, 1.0);
        assert_eq!(chains.len(), 1);
        assert!(chains[0].is_closed(EPS));
    }

    #[test]
    fn distinct_levels_stay_separate() {
        let segments = vec![
            seg(0.0, 0.0, 1.0, 0.0, 1.0),
            seg(0.0, 1.0, 1.0, 1.0, 2.0),
        ];
        let (chains, _) = assemble(&segments, EPS, 1.0);
        assert_eq!(chains.len(), 2);
        assert_ne!(chains[0].level, chains[1].level);
    }

    #[test]
    fn invalid_segments_are_skipped_and_counted() {
        let segments = vec![
            seg(0.0, 0.0, f64::NAN, 0.0, 1.0),
            seg(0.0, 0.0, 1.0, 0.0, 1.0),
        ];
        let (chains, diag) = assemble(&segments, EPS, 1.0);
        assert_eq!(diag.skipped_segments, 1);
        assert_eq!(chains.len(), 1);
    }

    #[test]
    fn no_segment_is_used_twice() {
        let segments = vec![
            seg(0.0, 0.0, 1.0, 0.0, 1.0),
            seg(1.0, 0.0, 1.0, 1.0, 1.0),
            seg(1.0, 1.0, 2.0, 1.0, 1.0),
        ];
        let (chains, _) = assemble(&segments, EPS, 1.0);
        let total_points: usize = chains.iter().map(|c| c.points.len() - 1).sum();
        assert_eq!(total_points, segments.len());
    }

    #[test]
    fn glue_u_merges_open_chains_within_radius() {
        let a = Chain::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)], 1.0);
        let b = Chain::new(vec![Point::new(1.0 + 1e-6, 0.0), Point::new(2.0, 0.0)], 1.0);
        let mut diag = Diagnostics::default();
        let out = glue_u(vec![a, b], 0.1, EPS, &mut diag);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].points.len(), 3);
        assert_eq!(diag.merges, 1);
    }

    #[test]
    fn glue_u_leaves_far_chains_open() {
        let a = Chain::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)], 1.0);
        let b = Chain::new(vec![Point::new(100.0, 0.0), Point::new(101.0, 0.0)], 1.0);
        let mut diag = Diagnostics::default();
        let out = glue_u(vec![a, b], 0.1, EPS, &mut diag);
        assert_eq!(out.len(), 2);
        assert_eq!(diag.merges, 0);
    }
}
