//! Spatial Index: a uniform grid hash from bucket key to the segments whose
//! bounding box overlaps that bucket.

use std::collections::{HashMap, HashSet};

use crate::types::{Point, Segment};

type BucketKey = (i64, i64);

/// Grid-bucketed lookup from a point to nearby segments, keyed by index
/// into the caller's segment slice.
pub struct SpatialIndex {
    bucket_size: f64,
    buckets: HashMap<BucketKey, Vec<usize>>,
}

impl SpatialIndex {
    fn key(&self, x: f64, y: f64) -> BucketKey {
        ((x / self.bucket_size).floor() as i64, (y / self.bucket_size).floor() as i64)
    }

    /// Build an index over `segments`, bucketing both endpoints and every
    /// bucket cell the segment's axis-aligned bounding box overlaps.
    pub fn build(segments: &[Segment], bucket_size: f64) -> Self {
        let mut index = SpatialIndex {
            bucket_size,
            buckets: HashMap::new(),
        };
        for (i, seg) in segments.iter().enumerate() {
            let min_x = seg.p1.x.min(seg.p2.x);
            let max_x = seg.p1.x.max(seg.p2.x);
            let min_y = seg.p1.y.min(seg.p2.y);
            let max_y = seg.p1.y.max(seg.p2.y);
            let (kx0, ky0) = index.key(min_x, min_y);
            let (kx1, ky1) = index.key(max_x, max_y);
            for kx in kx0..=kx1 {
                for ky in ky0..=ky1 {
                    index.buckets.entry((kx, ky)).or_default().push(i);
                }
            }
        }
        index
    }

    /// Every segment in the 3x3 block of buckets around `point` whose
    /// either endpoint is within `epsilon` of `point`. Duplicates across
    /// overlapping buckets are suppressed.
    pub fn find_neighbors(&self, point: Point, epsilon: f64, segments: &[Segment]) -> Vec<usize> {
        let (kx, ky) = self.key(point.x, point.y);
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(indices) = self.buckets.get(&(kx + dx, ky + dy)) {
                    for &i in indices {
                        if !seen.insert(i) {
                            continue;
                        }
                        let seg = &segments[i];
                        if seg.p1.distance(&point) <= epsilon || seg.p2.distance(&point) <= epsilon {
                            result.push(i);
                        }
                    }
                }
            }
        }
        result
    }
}
