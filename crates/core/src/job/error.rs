//! Error types for the job store and pipeline.

use thiserror::Error;

use super::types::JobStatus;
use crate::scene::SceneError;

/// Errors returned by a [`JobStore`](super::JobStore).
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job is not in a state the transition can leave.
    #[error("Cannot move job {id} from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job store lock poisoned")]
    LockPoisoned,
}

/// Errors returned to callers of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request was rejected before a job was created.
    #[error("Invalid request: {0}")]
    Validation(#[from] SceneError),

    #[error(transparent)]
    Store(#[from] JobError),
}

impl PipelineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::Store(JobError::NotFound(_)))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PipelineError::Store(JobError::InvalidTransition { .. }))
    }
}
