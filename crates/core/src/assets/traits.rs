//! The asset staging port.

use async_trait::async_trait;
use std::path::Path;

use super::error::AssetError;
use crate::scene::CompositionRequest;

/// Materializes a request's media into a job's working directory.
#[async_trait]
pub trait AssetStager: Send + Sync {
    /// Returns a copy of `request` whose sources are all local paths.
    ///
    /// Empty sources are left untouched for the compiler to skip.
    async fn stage(
        &self,
        job_id: &str,
        request: &CompositionRequest,
        work_dir: &Path,
    ) -> Result<CompositionRequest, AssetError>;
}
