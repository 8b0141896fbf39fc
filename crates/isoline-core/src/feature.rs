//! Output feature schema and the closure-classification policy that decides
//! whether a chain ships as a `Polygon` or a `LineString`.

use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::types::{Chain, ClosureOrigin, Diagnostics};

/// A finished piece of output geometry: either a closed ring or an open
/// polyline, tagged with the level it was extracted at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Feature {
    Polygon {
        level: f64,
        coordinates: Vec<[f64; 2]>,
        closure_origin: ClosureOrigin,
    },
    LineString {
        level: f64,
        coordinates: Vec<[f64; 2]>,
        closure_origin: ClosureOrigin,
    },
}

/// Apply the closure policy to a single chain in place.
///
/// Chains already closed by cross-tile merging or endpoint snapping keep
/// that origin untouched. Everything else is reclassified as `Natural` if
/// its endpoints already coincide within `epsilon`, as `Forced` if the
/// caller asked for polygonization and the gap is within
/// `max_force_close_distance`, or left `Open` otherwise.
pub fn finalize_closure(chain: &mut Chain, opts: &Options, diagnostics: &mut Diagnostics) {
    if matches!(
        chain.closure_origin,
        ClosureOrigin::Merged | ClosureOrigin::PostMergeSnap
    ) {
        return;
    }
    if chain.points.len() < 3 {
        chain.closure_origin = ClosureOrigin::Open;
        return;
    }
    let gap = chain
        .points
        .first()
        .unwrap()
        .distance(chain.points.last().unwrap());
    if gap < opts.epsilon {
        chain.closure_origin = ClosureOrigin::Natural;
    } else if opts.force_polygon_closure && gap <= opts.max_force_close_distance {
        let first = *chain.points.first().unwrap();
        chain.points.push(first);
        chain.closure_origin = ClosureOrigin::Forced;
        diagnostics.forced_closures += 1;
    } else {
        chain.closure_origin = ClosureOrigin::Open;
    }
}

/// Serialize a batch of features to the wire JSON representation callers
/// ship over HTTP or write to disk.
pub fn features_to_json(features: &[Feature]) -> serde_json::Result<String> {
    serde_json::to_string(features)
}

/// Parse a previously-serialized feature batch back into [`Feature`]s.
pub fn features_from_json(json: &str) -> serde_json::Result<Vec<Feature>> {
    serde_json::from_str(json)
}

/// Convert a finalized chain into its output [`Feature`].
pub fn chain_to_feature(chain: &Chain) -> Feature {
    let coordinates: Vec<[f64; 2]> = chain.points.iter().map(|p| [p.x, p.y]).collect();
    match chain.closure_origin {
        ClosureOrigin::Open => Feature::LineString {
            level: chain.level,
            coordinates,
            closure_origin: ClosureOrigin::Open,
        },
        origin => Feature::Polygon {
            level: chain.level,
            coordinates,
            closure_origin: origin,
        },
    }
}
