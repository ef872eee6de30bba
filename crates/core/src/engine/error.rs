//! Error types for the engine module.

use std::path::PathBuf;
use thiserror::Error;

use super::backend::Backend;

/// Errors raised while probing or running the external engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine binary not found.
    #[error("Engine not found at path: {path}")]
    NotFound { path: PathBuf },

    /// The engine build does not include the encoder.
    #[error("Encoder not available: {encoder}")]
    EncoderUnavailable { encoder: String },

    /// A synthetic test encode failed.
    #[error("Probe for {backend} failed: {reason}")]
    ProbeFailed { backend: Backend, reason: String },

    /// The engine exited unsuccessfully. `stderr` is kept verbatim.
    #[error("Engine exited with code {code}: {stderr}")]
    ExecutionFailed { code: i32, stderr: String },

    /// The engine did not finish in time and was killed.
    #[error("Engine timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error talking to the engine process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn probe_failed(backend: Backend, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            backend,
            reason: reason.into(),
        }
    }
}
