//! Liang-Barsky polyline clipping against an axis-aligned box, splitting a
//! chain into sub-chains wherever clipping introduces a discontinuity.

use crate::types::Point;

/// Clip the segment `p0 -> p1` against `[min_x, max_x] x [min_y, max_y]`.
/// Returns the visible sub-segment, if any.
fn liang_barsky(
    p0: Point,
    p1: Point,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<(Point, Point)> {
    let dx = p1.x - p0.x;
    let dy = p1.y - p0.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let checks = [
        (-dx, p0.x - min_x),
        (dx, max_x - p0.x),
        (-dy, p0.y - min_y),
        (dy, max_y - p0.y),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None; // parallel to this edge and outside it
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return None;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }

    if t0 > t1 {
        return None;
    }
    let a = Point::new(p0.x + t0 * dx, p0.y + t0 * dy);
    let b = Point::new(p0.x + t1 * dx, p0.y + t1 * dy);
    Some((a, b))
}

/// Clip a polyline (open or closed) to a box, splitting it into one or more
/// sub-chains wherever the clip leaves a gap.
pub fn clip_polyline_to_box(
    points: &[Point],
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Vec<Vec<Point>> {
    let mut runs: Vec<Vec<Point>> = Vec::new();
    for w in points.windows(2) {
        let Some((a, b)) = liang_barsky(w[0], w[1], min_x, min_y, max_x, max_y) else {
            continue;
        };
        let joins_previous = runs
            .last()
            .and_then(|run| run.last())
            .map(|tail| tail.distance(&a) < 1e-9)
            .unwrap_or(false);
        if joins_previous {
            runs.last_mut().unwrap().push(b);
        } else {
            runs.push(vec![a, b]);
        }
    }
    runs
}
