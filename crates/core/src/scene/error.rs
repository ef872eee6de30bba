//! Validation errors for composition requests.

use thiserror::Error;

/// A malformed or incomplete composition request.
///
/// These are raised before a job exists and are never retried.
#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    /// Total duration must be a positive, finite number of seconds.
    #[error("duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    /// Output dimensions must both be non-zero.
    #[error("output size must be non-zero, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// A numeric field holds NaN or infinity.
    #[error("{field} must be a finite number")]
    NonFinite { field: String },

    /// Audio volume must not be negative.
    #[error("audio track {index} has negative volume {volume}")]
    NegativeVolume { index: usize, volume: f64 },
}
