//! Error types for isoline extraction.

use thiserror::Error;

/// Errors that can occur while extracting or stitching isolines.
#[derive(Error, Debug)]
pub enum IsolineError {
    /// A grid or tile did not satisfy the shape invariants (rectangular,
    /// at least 2x2). Fatal to the call; no state is mutated.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A configuration option was rejected at construction time.
    #[error("invalid option `{key}`: {reason}")]
    InvalidOption { key: &'static str, reason: String },
}

impl IsolineError {
    /// Create an InvalidShape error.
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        Self::InvalidShape(msg.into())
    }

    /// Create an InvalidOption error.
    pub fn invalid_option(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for isoline operations.
pub type Result<T> = std::result::Result<T, IsolineError>;
