//! Job API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use montage_core::{CompositionRequest, JobFilter, JobReport, JobStatus, PipelineError};

use crate::state::AppState;

/// Maximum allowed limit for job queries
const MAX_LIMIT: usize = 1000;

/// Default limit for job queries
const DEFAULT_LIMIT: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    /// Filter by status
    pub status: Option<String>,
    /// Maximum number of jobs to return
    pub limit: Option<usize>,
    /// Pagination offset
    pub offset: Option<usize>,
}

/// Request body for cancelling a job
#[derive(Debug, Deserialize)]
pub struct CancelJobBody {
    /// Optional reason for cancellation
    pub reason: Option<String>,
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobReport>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<JobErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(JobErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<PipelineError> for JobErrorResponse {
    fn from(e: PipelineError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

fn pipeline_error(e: PipelineError) -> ApiError {
    let status = match &e {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        e if e.is_conflict() => StatusCode::CONFLICT,
        _ => {
            error!(error = %e, "Job store error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(JobErrorResponse::from(e)))
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a composition request
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompositionRequest>,
) -> Result<(StatusCode, Json<JobReport>), ApiError> {
    let report = state.pipeline().submit(request).map_err(pipeline_error)?;
    Ok((StatusCode::ACCEPTED, Json(report)))
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobReport>, ApiError> {
    match state.pipeline().get(&id).map_err(pipeline_error)? {
        Some(report) => Ok(Json(report)),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Job not found: {}", id),
        )),
    }
}

/// List jobs with optional status filter
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let mut filter = JobFilter::new().with_limit(limit).with_offset(offset);
    if let Some(ref status) = params.status {
        let status: JobStatus = status
            .parse()
            .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_status(status);
    }

    let jobs = state.pipeline().list(&filter).map_err(pipeline_error)?;
    let total = state.pipeline().count(&filter).map_err(pipeline_error)?;

    Ok(Json(ListJobsResponse {
        jobs,
        total,
        limit,
        offset,
    }))
}

/// Cancel a job (DELETE endpoint)
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<CancelJobBody>>,
) -> Result<Json<JobReport>, ApiError> {
    let reason = body.and_then(|b| b.0.reason);
    let report = state.pipeline().cancel(&id, reason).map_err(pipeline_error)?;
    Ok(Json(report))
}
