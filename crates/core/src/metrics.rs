//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job pipeline (submissions, terminal outcomes, render time)
//! - Capability negotiation (probe outcomes per backend)
//! - Asset fetching (upstream request attempts)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs accepted for processing.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("montage_jobs_submitted_total", "Total jobs submitted").unwrap()
});

/// Jobs reaching a terminal state.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("montage_jobs_finished_total", "Total jobs finished"),
        &["status"], // "completed", "failed", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Engine
// =============================================================================

/// Duration of engine renders in seconds.
pub static ENGINE_RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "montage_engine_run_duration_seconds",
            "Duration of external engine renders",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["backend", "result"],
    )
    .unwrap()
});

/// Capability probe outcomes.
pub static PROBE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("montage_probe_outcomes_total", "Capability probes by outcome"),
        &["backend", "result"], // result: "ok", "failed"
    )
    .unwrap()
});

// =============================================================================
// Asset fetching
// =============================================================================

/// Upstream fetch attempts.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("montage_fetch_attempts_total", "Asset download attempts"),
        &["result"], // "ok", "transient", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(ENGINE_RUN_DURATION.clone()),
        Box::new(PROBE_OUTCOMES.clone()),
        Box::new(FETCH_ATTEMPTS.clone()),
    ]
}
