//! FFmpeg-backed engine.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::backend::{Backend, EncoderProfile};
use super::capabilities::EncoderCapabilities;
use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::{EngineOutput, ExternalEngine};

/// Source used for test encodes.
const PROBE_SOURCE: &str = "testsrc2=size=256x144:rate=25";
const PROBE_FRAMES: &str = "5";

/// Runs ffmpeg as a child process.
pub struct FfmpegEngine {
    config: EngineConfig,
    capabilities: OnceCell<EncoderCapabilities>,
}

impl FfmpegEngine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            capabilities: OnceCell::new(),
        }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compiled-in encoders.
    ///
    /// Listed once per engine; a failed listing is not kept, so the next
    /// call tries again.
    pub async fn capabilities(&self) -> Result<&EncoderCapabilities, EngineError> {
        self.capabilities
            .get_or_try_init(|| EncoderCapabilities::detect(&self.config))
            .await
    }

    /// Checks that the ffmpeg binary can be started.
    pub async fn validate(&self) -> Result<(), EngineError> {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        Ok(())
    }

    fn probe_args(backend: Backend) -> Vec<String> {
        let profile = EncoderProfile::for_backend(backend, 28);
        let mut args: Vec<String> = profile.hwaccel_args.clone();
        args.extend(
            ["-f", "lavfi", "-i", PROBE_SOURCE, "-frames:v", PROBE_FRAMES]
                .into_iter()
                .map(String::from),
        );
        args.extend(profile.codec_args());
        args.extend([
            "-pix_fmt".to_string(),
            profile
                .pixel_format
                .unwrap_or_else(|| "yuv420p".to_string()),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]);
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> EngineError {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            EngineError::Io(e)
        }
    }

    async fn execute(&self, args: &[String], timeout_secs: u64) -> Result<EngineOutput, EngineError> {
        let start = Instant::now();
        let child = Command::new(&self.config.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", self.config.log_level.as_str()])
            .args(&self.config.extra_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the child on timeout kills it.
        let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_secs, "ffmpeg timed out, killed");
                return Err(EngineError::Timeout { timeout_secs });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(EngineError::ExecutionFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(EngineOutput {
            stderr,
            elapsed: start.elapsed(),
        })
    }
}

#[async_trait]
impl ExternalEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, backend: Backend) -> Result<(), EngineError> {
        let capabilities = self
            .capabilities()
            .await
            .map_err(|e| EngineError::probe_failed(backend, format!("cannot list encoders: {}", e)))?;
        if !capabilities.supports(backend) {
            return Err(EngineError::EncoderUnavailable {
                encoder: backend.encoder().to_string(),
            });
        }

        let args = Self::probe_args(backend);
        match self.execute(&args, self.config.probe_timeout_secs).await {
            Ok(output) => {
                debug!(%backend, elapsed_ms = output.elapsed.as_millis() as u64, "Probe succeeded");
                Ok(())
            }
            Err(EngineError::ExecutionFailed { stderr, .. }) => {
                Err(EngineError::probe_failed(backend, stderr.trim()))
            }
            Err(e) => Err(EngineError::probe_failed(backend, e.to_string())),
        }
    }

    async fn run(&self, args: &[String]) -> Result<EngineOutput, EngineError> {
        debug!(arg_count = args.len(), "Starting ffmpeg");
        let output = self.execute(args, self.config.run_timeout_secs).await?;
        info!(elapsed_ms = output.elapsed.as_millis() as u64, "ffmpeg finished");
        Ok(output)
    }
}
