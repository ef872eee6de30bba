//! Mock asset stager for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::assets::{AssetError, AssetStager};
use crate::scene::CompositionRequest;

/// Mock implementation of the AssetStager trait.
///
/// Creates the working directory and hands the request back unchanged, so
/// sources in tests should already be local paths.
#[derive(Debug, Default)]
pub struct MockStager {
    /// Job ids staged, in call order.
    staged: Arc<RwLock<Vec<String>>>,
    /// If set, the next stage call fails with this error.
    next_error: Arc<RwLock<Option<AssetError>>>,
}

impl MockStager {
    /// Create a new mock stager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Job ids staged so far.
    pub async fn staged(&self) -> Vec<String> {
        self.staged.read().await.clone()
    }

    /// Configure the next stage call to fail with the given error.
    pub async fn set_next_error(&self, error: AssetError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl AssetStager for MockStager {
    async fn stage(
        &self,
        job_id: &str,
        request: &CompositionRequest,
        work_dir: &Path,
    ) -> Result<CompositionRequest, AssetError> {
        self.staged.write().await.push(job_id.to_string());
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| AssetError::io(work_dir, e))?;
        Ok(request.clone())
    }
}
