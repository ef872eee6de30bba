//! Mock engine for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use crate::engine::{Backend, EngineError, EngineOutput, ExternalEngine};

/// Mock implementation of the ExternalEngine trait.
///
/// Provides controllable behavior for testing:
/// - Per-backend probe outcomes (everything fails unless configured)
/// - Recorded probe and run calls
/// - Injected run failures, delays and panics
/// - A gate that holds runs until released
///
/// # Example
///
/// ```rust,ignore
/// use montage_core::testing::MockEngine;
///
/// let engine = MockEngine::new();
/// engine.set_probe_result(Backend::Nvenc, true).await;
/// engine.hold_runs();
/// // ... submit a job, wait for engine.run_count() == 1 ...
/// engine.release_runs();
/// ```
#[derive(Debug)]
pub struct MockEngine {
    /// Probe outcome by backend.
    probe_results: Arc<RwLock<HashMap<Backend, bool>>>,
    /// Backends probed, in call order.
    probed: Arc<RwLock<Vec<Backend>>>,
    /// Argument lists of every run.
    runs: Arc<RwLock<Vec<Vec<String>>>>,
    /// If set, the next run fails with this error.
    next_error: Arc<RwLock<Option<EngineError>>>,
    /// Simulated run duration.
    run_delay: Arc<RwLock<Duration>>,
    /// Panic inside the next run.
    panic_on_run: Arc<RwLock<bool>>,
    /// Runs wait while this is false.
    gate: watch::Sender<bool>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine.
    pub fn new() -> Self {
        Self {
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            probed: Arc::new(RwLock::new(Vec::new())),
            runs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            run_delay: Arc::new(RwLock::new(Duration::ZERO)),
            panic_on_run: Arc::new(RwLock::new(false)),
            gate: watch::channel(true).0,
        }
    }

    /// Set whether probing `backend` succeeds.
    pub async fn set_probe_result(&self, backend: Backend, ok: bool) {
        self.probe_results.write().await.insert(backend, ok);
    }

    /// Backends probed so far.
    pub async fn probed(&self) -> Vec<Backend> {
        self.probed.read().await.clone()
    }

    /// Argument lists of every run so far.
    pub async fn recorded_runs(&self) -> Vec<Vec<String>> {
        self.runs.read().await.clone()
    }

    /// Number of runs started.
    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Configure the next run to fail with the given error.
    pub async fn set_next_error(&self, error: EngineError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated run duration.
    pub async fn set_run_delay(&self, delay: Duration) {
        *self.run_delay.write().await = delay;
    }

    /// Make the next run panic.
    pub async fn set_panic_on_run(&self, panic: bool) {
        *self.panic_on_run.write().await = panic;
    }

    /// Block runs until [`release_runs`](Self::release_runs).
    pub fn hold_runs(&self) {
        self.gate.send_replace(false);
    }

    /// Let held and future runs proceed.
    pub fn release_runs(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl ExternalEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, backend: Backend) -> Result<(), EngineError> {
        self.probed.write().await.push(backend);
        let ok = self
            .probe_results
            .read()
            .await
            .get(&backend)
            .copied()
            .unwrap_or(false);
        if ok {
            Ok(())
        } else {
            Err(EngineError::probe_failed(backend, "mock probe failure"))
        }
    }

    async fn run(&self, args: &[String]) -> Result<EngineOutput, EngineError> {
        self.runs.write().await.push(args.to_vec());

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let delay = *self.run_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let should_panic = std::mem::take(&mut *self.panic_on_run.write().await);
        if should_panic {
            panic!("mock engine crashed");
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(EngineOutput {
            stderr: String::new(),
            elapsed: delay,
        })
    }
}
