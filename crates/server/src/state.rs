use chrono::{DateTime, Utc};
use montage_core::{Config, HttpAssetStager, JobPipeline};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    pipeline: JobPipeline,
    fetcher: Option<Arc<HttpAssetStager>>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, pipeline: JobPipeline) -> Self {
        Self {
            config,
            pipeline,
            fetcher: None,
            started_at: Utc::now(),
        }
    }

    /// Exposes the download pool and rate limiter of `fetcher`.
    pub fn with_fetcher(mut self, fetcher: Arc<HttpAssetStager>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn fetcher(&self) -> Option<&HttpAssetStager> {
        self.fetcher.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &JobPipeline {
        &self.pipeline
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
