//! The external engine port.

use async_trait::async_trait;
use std::time::Duration;

use super::backend::Backend;
use super::error::EngineError;

/// Result of a successful engine run.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    /// Diagnostic output of the run.
    pub stderr: String,
    pub elapsed: Duration,
}

/// An external process that executes compiled programs.
///
/// The job pipeline only talks to the engine through this trait, so tests
/// can swap in a fake.
#[async_trait]
pub trait ExternalEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Checks that `backend` can encode in the current environment.
    ///
    /// Must be short, bounded in time and free of side effects.
    async fn probe(&self, backend: Backend) -> Result<(), EngineError>;

    /// Runs the engine with `args` and waits for it to exit.
    async fn run(&self, args: &[String]) -> Result<EngineOutput, EngineError>;
}
