//! Job pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where jobs keep their files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobConfig {
    /// Root of per-job scratch directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Directory rendered files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Keep a failed job's scratch directory for inspection.
    #[serde(default)]
    pub retain_failed_workdir: bool,
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("montage")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            output_dir: default_output_dir(),
            retain_failed_workdir: false,
        }
    }
}

impl JobConfig {
    pub fn new(work_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output_dir: output_dir.into(),
            retain_failed_workdir: false,
        }
    }

    pub fn with_retain_failed_workdir(mut self, retain: bool) -> Self {
        self.retain_failed_workdir = retain;
        self
    }

    /// Scratch directory for one job.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(job_id)
    }

    /// Rendered file for one job.
    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", job_id))
    }
}
