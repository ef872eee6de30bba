//! Configuration for the engine module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::backend::Backend;

/// Configuration for the ffmpeg engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Timeout for a single capability probe in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Timeout for a single render in seconds.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Backend to try first instead of auto-detecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_run_timeout() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            probe_timeout_secs: default_probe_timeout(),
            run_timeout_secs: default_run_timeout(),
            log_level: default_log_level(),
            extra_args: Vec::new(),
            backend: None,
        }
    }
}

impl EngineConfig {
    /// Sets the ffmpeg binary path.
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Sets the render timeout in seconds.
    pub fn with_run_timeout(mut self, timeout_secs: u64) -> Self {
        self.run_timeout_secs = timeout_secs;
        self
    }

    /// Pins a backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }
}
