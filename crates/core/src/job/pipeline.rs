//! Job pipeline: submission and the per-job worker.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::config::JobConfig;
use super::error::{JobError, PipelineError};
use super::store::{JobFilter, JobStore};
use super::types::{Job, JobReport, JobTransition};
use crate::assets::{AssetError, AssetStager};
use crate::engine::{Backend, CapabilityNegotiator, EngineError, ExternalEngine};
use crate::graph::{build_args, GraphCompiler, RenderConfig};
use crate::metrics;
use crate::scene::CompositionRequest;

/// Observer invoked after every job state change.
pub type UpdateCallback = Arc<dyn Fn(&JobReport) + Send + Sync>;

/// Why a worker stopped before completing its job.
#[derive(Debug, Error)]
enum WorkerError {
    #[error("Asset staging failed: {0}")]
    Assets(#[from] AssetError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] JobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker panicked: {0}")]
    Panicked(String),
}

/// Accepts composition requests and drives each one to a terminal state.
///
/// Every submission gets its own background task; there is no global limit
/// on concurrent jobs. Cancellation is advisory: it flags the job, and the
/// worker notices at its next checkpoint because the store refuses to move
/// a cancelled job anywhere else. An engine process already running is left
/// to finish.
#[derive(Clone)]
pub struct JobPipeline {
    engine: Arc<dyn ExternalEngine>,
    stager: Arc<dyn AssetStager>,
    store: Arc<dyn JobStore>,
    negotiator: Arc<CapabilityNegotiator>,
    render: RenderConfig,
    jobs: JobConfig,
    backend: Option<Backend>,
    on_update: Option<UpdateCallback>,
}

impl JobPipeline {
    pub fn new(
        engine: Arc<dyn ExternalEngine>,
        stager: Arc<dyn AssetStager>,
        store: Arc<dyn JobStore>,
        render: RenderConfig,
        jobs: JobConfig,
    ) -> Self {
        let negotiator = Arc::new(CapabilityNegotiator::new(engine.clone()).with_quality(render.crf));
        Self {
            engine,
            stager,
            store,
            negotiator,
            render,
            jobs,
            backend: None,
            on_update: None,
        }
    }

    /// Backend to try first when a request does not pin one.
    pub fn with_backend(mut self, backend: Option<Backend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_update_callback(mut self, callback: UpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    pub fn negotiator(&self) -> &CapabilityNegotiator {
        &self.negotiator
    }

    /// Validates `request`, records a pending job and schedules it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: CompositionRequest) -> Result<JobReport, PipelineError> {
        request.validate()?;

        let job = self.store.create(&request.title)?;
        metrics::JOBS_SUBMITTED.inc();
        info!(job_id = %job.id, title = %job.title, "Job submitted");
        self.notify(&job);

        let pipeline = self.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move { pipeline.run_job(job_id, request).await });

        Ok(job.report())
    }

    /// Flags a pending or processing job as cancelled.
    pub fn cancel(&self, id: &str, reason: Option<String>) -> Result<JobReport, PipelineError> {
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "Cancelled by request".to_string());
        let job = self.transition(id, JobTransition::Cancel { reason })?;
        info!(job_id = %id, "Job cancelled");
        Ok(job.report())
    }

    pub fn get(&self, id: &str) -> Result<Option<JobReport>, PipelineError> {
        Ok(self.store.get(id)?.map(|job| job.report()))
    }

    pub fn list(&self, filter: &JobFilter) -> Result<Vec<JobReport>, PipelineError> {
        Ok(self
            .store
            .list(filter)?
            .iter()
            .map(Job::report)
            .collect())
    }

    pub fn count(&self, filter: &JobFilter) -> Result<usize, PipelineError> {
        Ok(self.store.count(filter)?)
    }

    async fn run_job(self, job_id: String, request: CompositionRequest) {
        let work_dir = self.jobs.job_dir(&job_id);

        // Run the phases on their own task so a panic is contained to this job.
        let worker = self.clone();
        let id = job_id.clone();
        let dir = work_dir.clone();
        let outcome = match tokio::spawn(async move { worker.execute(&id, request, &dir).await }).await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(WorkerError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(WorkerError::Panicked(e.to_string())),
        };

        match outcome {
            Ok(output) => {
                remove_work_dir(&job_id, &work_dir).await;
                match self.transition(&job_id, JobTransition::Complete { output }) {
                    Ok(job) => info!(job_id = %job_id, output = ?job.output_path, "Job completed"),
                    Err(JobError::InvalidTransition { from, .. }) => {
                        info!(job_id = %job_id, status = %from, "Render finished after job left processing")
                    }
                    Err(e) => error!(job_id = %job_id, error = %e, "Failed to record completion"),
                }
            }
            Err(WorkerError::Store(JobError::InvalidTransition { from, .. })) => {
                debug!(job_id = %job_id, status = %from, "Job left processing, halting worker");
                remove_work_dir(&job_id, &work_dir).await;
            }
            Err(e) => {
                let message = e.to_string();
                error!(job_id = %job_id, error = %message, "Job failed");
                if let Err(e) = self.transition(&job_id, JobTransition::Fail { error: message }) {
                    warn!(job_id = %job_id, error = %e, "Failed to record failure");
                }
                if self.jobs.retain_failed_workdir {
                    info!(job_id = %job_id, path = %work_dir.display(), "Keeping working directory");
                } else {
                    remove_work_dir(&job_id, &work_dir).await;
                }
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        request: CompositionRequest,
        work_dir: &Path,
    ) -> Result<PathBuf, WorkerError> {
        self.transition(job_id, JobTransition::Start)?;

        let staged = self.stager.stage(job_id, &request, work_dir).await?;
        self.progress(job_id, 30, "Assets staged")?;

        let program = GraphCompiler::new(self.render.clone()).compile(&staged);
        debug!(job_id, nodes = program.graph.len(), program = %program.program(), "Graph compiled");

        let profile = self.negotiator.negotiate(staged.backend.or(self.backend)).await;
        tokio::fs::create_dir_all(&self.jobs.output_dir).await?;
        let output = self.jobs.output_path(job_id);
        let args = build_args(&program, &profile, &self.render, &output);
        self.progress(job_id, 50, &format!("Rendering with {}", profile.backend))?;

        let started = Instant::now();
        let result = self.engine.run(&args).await;
        metrics::ENGINE_RUN_DURATION
            .with_label_values(&[
                profile.backend.as_str(),
                if result.is_ok() { "ok" } else { "failed" },
            ])
            .observe(started.elapsed().as_secs_f64());
        let run = result?;
        debug!(job_id, elapsed_ms = run.elapsed.as_millis() as u64, "Engine finished");

        self.progress(job_id, 90, "Render finished")?;
        Ok(output)
    }

    fn progress(&self, job_id: &str, progress: u8, message: &str) -> Result<Job, JobError> {
        self.transition(
            job_id,
            JobTransition::Progress {
                progress,
                message: message.to_string(),
            },
        )
    }

    fn transition(&self, job_id: &str, transition: JobTransition) -> Result<Job, JobError> {
        let job = self.store.update_state(job_id, transition)?;
        if job.status.is_terminal() {
            metrics::JOBS_FINISHED
                .with_label_values(&[job.status.as_str()])
                .inc();
        }
        self.notify(&job);
        Ok(job)
    }

    fn notify(&self, job: &Job) {
        if let Some(callback) = &self.on_update {
            callback(&job.report());
        }
    }
}

async fn remove_work_dir(job_id: &str, dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(job_id, path = %dir.display(), "Removed working directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(job_id, path = %dir.display(), error = %e, "Failed to remove working directory"),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
