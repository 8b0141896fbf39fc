//! Grid-to-isoline extraction.
//!
//! ```text
//!              +-------------+     +-------------+     +--------------+
//!  Grid --->   | Preprocess  | --> |   CONREC    | --> |    Chain     |
//!              | (poles,     |     | (4-triangle |     |  Assembler   |
//!              |  antimerid.)|     |  decomp.)   |     | (+ Glue-U)   |
//!              +-------------+     +-------------+     +------+-------+
//!                                                              |
//!                                                              v
//!                                                      +---------------+
//!                                                      | Closure policy|
//!                                                      | -> Feature    |
//!                                                      +---------------+
//! ```
//!
//! [`compute_whole`] runs this pipeline over an entire grid in one pass.
//! [`TileBuilder`] runs the same pipeline per tile, with by-value boundary
//! strips and a cross-tile stitcher standing in for the single grid pass so
//! arbitrarily large domains can be processed incrementally.

pub mod chain;
pub mod clip;
pub mod config;
pub mod conrec;
pub mod error;
pub mod feature;
pub mod grid;
pub mod preprocess;
pub mod spatial_index;
pub mod stitch;
pub mod tile;
pub mod types;

pub use config::Options;
pub use error::{IsolineError, Result};
pub use feature::{features_from_json, features_to_json, Feature};
pub use grid::Grid;
pub use tile::TileBuilder;
pub use types::Diagnostics;

use tracing::debug;

/// Extract isolines from a whole grid in one pass.
///
/// Runs preprocessing, CONREC, and chain assembly; if `options.force_polygon_closure`
/// is set, also runs the Glue-U merge pass before applying the closure
/// policy to every resulting chain.
pub fn compute_whole(
    grid: &Grid,
    levels: &[f64],
    options: &Options,
) -> error::Result<(Vec<Feature>, Diagnostics)> {
    options.validate()?;
    let mut diagnostics = Diagnostics::default();

    let preprocessed = preprocess::preprocess(grid);
    let segments = conrec::compute_segments(
        preprocessed.rows(),
        preprocessed.cols(),
        preprocessed.as_slice(),
        levels,
        options.epsilon,
    );
    let (mut chains, assemble_diag) = chain::assemble(&segments, options.epsilon, options.bucket_size);
    diagnostics.merge(&assemble_diag);

    if options.force_polygon_closure {
        chains = chain::glue_u(chains, options.glue_mu(), options.epsilon, &mut diagnostics);
    }

    for chain in chains.iter_mut() {
        feature::finalize_closure(chain, options, &mut diagnostics);
    }

    debug!(
        rows = grid.rows(),
        cols = grid.cols(),
        levels = levels.len(),
        chains = chains.len(),
        merges = diagnostics.merges,
        forced_closures = diagnostics.forced_closures,
        "computed isolines for whole grid"
    );

    let features = chains.iter().map(feature::chain_to_feature).collect();
    Ok((features, diagnostics))
}
