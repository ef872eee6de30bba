//! Render jobs.
//!
//! A job moves `pending -> processing -> {completed | failed | cancelled}`.
//! [`JobPipeline`] creates jobs and runs each on its own task; the
//! [`JobStore`] is the only place job records live.

mod config;
mod error;
mod pipeline;
mod store;
mod types;

pub use config::JobConfig;
pub use error::{JobError, PipelineError};
pub use pipeline::{JobPipeline, UpdateCallback};
pub use store::{InMemoryJobStore, JobFilter, JobStore};
pub use types::{Job, JobReport, JobStatus, JobTransition};
