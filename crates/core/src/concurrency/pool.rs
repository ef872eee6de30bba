//! Bounded worker pool.
//!
//! Runs a batch of items through an async function with at most
//! `max_concurrency` in flight. A failing item never cancels its siblings:
//! every failure is collected and reported together once the whole batch
//! has finished.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One failed item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Position of the item in the submitted batch.
    pub index: usize,
    pub message: String,
}

/// Aggregate failure of a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{} of {total} items failed; first: {}", .failures.len(), first_message(.failures))]
pub struct BatchError {
    pub total: usize,
    /// Sorted by index.
    pub failures: Vec<ItemFailure>,
}

fn first_message(failures: &[ItemFailure]) -> &str {
    failures.first().map_or("", |f| f.message.as_str())
}

/// Status of a worker pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStatus {
    /// Pool name (e.g., "fetch").
    pub name: String,
    /// Number of items currently running.
    pub active: usize,
    /// Maximum items in flight.
    pub max_concurrent: usize,
    /// Total items processed since startup.
    pub total_processed: u64,
    /// Total items failed since startup.
    pub total_failed: u64,
}

/// Tracks statistics for a pool.
#[derive(Debug, Default)]
struct PoolStats {
    active: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn to_status(&self, name: &str, max_concurrent: usize) -> PoolStatus {
        PoolStatus {
            name: name.to_string(),
            active: self.active.load(Ordering::Relaxed) as usize,
            max_concurrent,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// Semaphore-gated batch runner.
#[derive(Clone)]
pub struct WorkerPool {
    name: String,
    max_concurrency: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// A zero limit is treated as one.
    pub fn new(name: impl Into<String>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            name: name.into(),
            max_concurrency,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            stats: Arc::new(PoolStats::default()),
        }
    }

    pub fn status(&self) -> PoolStatus {
        self.stats.to_status(&self.name, self.max_concurrency)
    }

    /// Runs `task` over every item.
    ///
    /// Returns the outputs in item order if every item succeeded. Otherwise
    /// waits for the rest of the batch and returns every failure. A panic in
    /// one item counts as that item's failure.
    pub async fn run<T, R, E, F, Fut>(&self, items: Vec<T>, task: F) -> Result<Vec<R>, BatchError>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Display + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let total = items.len();
        let task = Arc::new(task);
        let failures: Arc<Mutex<Vec<ItemFailure>>> = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let semaphore = self.semaphore.clone();
                let stats = self.stats.clone();
                let task = task.clone();
                let failures = failures.clone();
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        record(&failures, index, "worker pool closed".to_string());
                        return None;
                    };
                    stats.active.fetch_add(1, Ordering::Relaxed);
                    let result = task(item).await;
                    stats.active.fetch_sub(1, Ordering::Relaxed);
                    stats.total_processed.fetch_add(1, Ordering::Relaxed);

                    match result {
                        Ok(output) => Some(output),
                        Err(e) => {
                            stats.total_failed.fetch_add(1, Ordering::Relaxed);
                            record(&failures, index, e.to_string());
                            None
                        }
                    }
                })
            })
            .collect();

        let mut outputs = Vec::with_capacity(total);
        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                    record(&failures, index, format!("task panicked: {}", e));
                    outputs.push(None);
                }
            }
        }

        let mut failures = std::mem::take(&mut *failures.lock().unwrap_or_else(|p| p.into_inner()));
        if failures.is_empty() {
            debug!(pool = %self.name, total, "Batch completed");
            return Ok(outputs.into_iter().flatten().collect());
        }

        failures.sort_by_key(|f| f.index);
        warn!(pool = %self.name, total, failed = failures.len(), "Batch had failures");
        Err(BatchError { total, failures })
    }
}

fn record(failures: &Mutex<Vec<ItemFailure>>, index: usize, message: String) {
    failures
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .push(ItemFailure { index, message });
}
