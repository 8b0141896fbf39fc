//! Configuration for isoline extraction and stitching.

use serde::{Deserialize, Serialize};

use crate::error::{IsolineError, Result};

/// Recognized configuration keys and their effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Equality / interpolation tolerance.
    pub epsilon: f64,

    /// Stitching / snap tolerance. Must be >= `epsilon`.
    pub overlap_tolerance: f64,

    /// Tile side length in grid cells.
    pub tile_size: usize,

    /// Width (in cells) of the boundary strip shared with neighbors.
    pub strip_width: usize,

    /// Enable forced closure of near-closed chains in the stitcher post-pass.
    pub force_polygon_closure: bool,

    /// Cap on the endpoint gap eligible for forced closure.
    pub max_force_close_distance: f64,

    /// Spatial-index bucket size, in grid coordinates.
    pub bucket_size: f64,

    /// Scales the Glue-U merge radius relative to `sqrt(2) * bucket_size`.
    pub glue_mu_factor: f64,
}

impl Default for Options {
    fn default() -> Self {
        let epsilon = 1e-4;
        Self {
            epsilon,
            overlap_tolerance: 1e-4,
            tile_size: 64,
            strip_width: 2,
            force_polygon_closure: false,
            max_force_close_distance: 10.0 * epsilon,
            bucket_size: 1.0,
            glue_mu_factor: 1.5,
        }
    }
}

impl Options {
    /// Validate the configuration, following `GridProcessorConfig::validate`'s
    /// style of one early-return per violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.epsilon <= 0.0 {
            return Err(IsolineError::invalid_option(
                "epsilon",
                "must be > 0",
            ));
        }
        if self.overlap_tolerance < self.epsilon {
            return Err(IsolineError::invalid_option(
                "overlap_tolerance",
                "must be >= epsilon",
            ));
        }
        if self.tile_size < 2 {
            return Err(IsolineError::invalid_option(
                "tile_size",
                "must be >= 2",
            ));
        }
        if self.strip_width < 1 {
            return Err(IsolineError::invalid_option(
                "strip_width",
                "must be >= 1",
            ));
        }
        if self.max_force_close_distance <= 0.0 {
            return Err(IsolineError::invalid_option(
                "max_force_close_distance",
                "must be > 0",
            ));
        }
        if self.bucket_size <= 0.0 {
            return Err(IsolineError::invalid_option(
                "bucket_size",
                "must be > 0",
            ));
        }
        if self.glue_mu_factor <= 0.0 {
            return Err(IsolineError::invalid_option(
                "glue_mu_factor",
                "must be > 0",
            ));
        }
        Ok(())
    }

    /// Glue-U merge radius `mu = sqrt(2) * bucket_size * glue_mu_factor`.
    pub fn glue_mu(&self) -> f64 {
        std::f64::consts::SQRT_2 * self.bucket_size * self.glue_mu_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn overlap_below_epsilon_rejected() {
        let mut opts = Options::default();
        opts.overlap_tolerance = opts.epsilon / 2.0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn tiny_tile_rejected() {
        let mut opts = Options::default();
        opts.tile_size = 1;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn glue_mu_scales_with_factor() {
        let opts = Options::default();
        let mu = opts.glue_mu();
        assert!((mu - std::f64::consts::SQRT_2 * 1.0 * 1.5).abs() < 1e-12);
    }
}
