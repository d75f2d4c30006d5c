use thiserror::Error;

/// Failures that abort a frame or refuse a configuration.
///
/// Recoverable per-point conditions (out-of-grid points, degenerate
/// correspondences, small clusters) are handled locally and never show up here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("sensor geometry needs at least one ring and one column, got {rings}x{columns}")]
    InvalidGeometry { rings: usize, columns: usize },

    #[error("ground analysis uses {ground_rings} ring pairs but the sensor only has {rings} rings")]
    TooFewRings { ground_rings: usize, rings: usize },

    #[error("the damped normal matrix is not positive definite (non-finite residuals or jacobian)")]
    SingularNormalMatrix,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
