//! Job records and their state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::JobError;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// A state change requested for a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    /// Worker picked the job up.
    Start,
    /// Coarse checkpoint while processing.
    Progress { progress: u8, message: String },
    Complete { output: PathBuf },
    Fail { error: String },
    Cancel { reason: String },
}

impl JobTransition {
    /// Status the job is in after the transition.
    pub fn target(&self) -> JobStatus {
        match self {
            JobTransition::Start | JobTransition::Progress { .. } => JobStatus::Processing,
            JobTransition::Complete { .. } => JobStatus::Completed,
            JobTransition::Fail { .. } => JobStatus::Failed,
            JobTransition::Cancel { .. } => JobStatus::Cancelled,
        }
    }

    fn allowed_from(&self, status: JobStatus) -> bool {
        match self {
            JobTransition::Start => status == JobStatus::Pending,
            JobTransition::Progress { .. } | JobTransition::Complete { .. } => {
                status == JobStatus::Processing
            }
            JobTransition::Fail { .. } | JobTransition::Cancel { .. } => {
                matches!(status, JobStatus::Pending | JobStatus::Processing)
            }
        }
    }
}

/// A render job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub status: JobStatus,
    /// Coarse phase indicator, 0-100.
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl Job {
    /// A fresh pending job with a random id.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            status: JobStatus::Pending,
            progress: 0,
            message: "Queued".to_string(),
            created_at: now,
            updated_at: now,
            output_path: None,
            error: None,
        }
    }

    /// Applies `transition`, or returns [`JobError::InvalidTransition`]
    /// leaving the job untouched.
    pub fn apply(&mut self, transition: JobTransition) -> Result<(), JobError> {
        if !transition.allowed_from(self.status) {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: transition.target(),
            });
        }

        self.status = transition.target();
        match transition {
            JobTransition::Start => {
                self.progress = 10;
                self.message = "Processing".to_string();
            }
            JobTransition::Progress { progress, message } => {
                self.progress = self.progress.max(progress.min(99));
                self.message = message;
            }
            JobTransition::Complete { output } => {
                self.progress = 100;
                self.message = "Completed".to_string();
                self.output_path = Some(output);
            }
            JobTransition::Fail { error } => {
                self.message = format!("Failed: {}", error);
                self.error = Some(error);
            }
            JobTransition::Cancel { reason } => {
                self.message = if reason.trim().is_empty() {
                    "Cancelled".to_string()
                } else {
                    reason
                };
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn report(&self) -> JobReport {
        JobReport::from(self)
    }
}

/// Status surface handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobReport {
    pub id: String,
    pub title: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobReport {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            title: job.title.clone(),
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            output: job
                .output_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processing() -> Job {
        let mut job = Job::new("test");
        job.apply(JobTransition::Start).unwrap();
        job
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new("intro");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(uuid::Uuid::parse_str(&job.id).is_ok());
    }

    #[test]
    fn test_happy_path() {
        let mut job = processing();
        assert_eq!(job.progress, 10);

        job.apply(JobTransition::Progress {
            progress: 50,
            message: "Graph compiled".to_string(),
        })
        .unwrap();
        assert_eq!(job.progress, 50);

        job.apply(JobTransition::Complete {
            output: PathBuf::from("/out/x.mp4"),
        })
        .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.report().output.as_deref(), Some("/out/x.mp4"));
    }

    #[test]
    fn test_progress_never_goes_backwards() {
        let mut job = processing();
        job.apply(JobTransition::Progress {
            progress: 50,
            message: "a".to_string(),
        })
        .unwrap();
        job.apply(JobTransition::Progress {
            progress: 30,
            message: "b".to_string(),
        })
        .unwrap();
        assert_eq!(job.progress, 50);
        assert_eq!(job.message, "b");
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = processing();
        job.apply(JobTransition::Cancel {
            reason: "user".to_string(),
        })
        .unwrap();

        let err = job
            .apply(JobTransition::Complete {
                output: PathBuf::from("/o.mp4"),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidTransition {
                from: JobStatus::Cancelled,
                to: JobStatus::Completed,
                ..
            }
        ));
        assert!(job
            .apply(JobTransition::Fail {
                error: "late".to_string()
            })
            .is_err());
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.message, "user");
        assert!(job.output_path.is_none());
    }

    #[test]
    fn test_pending_can_be_cancelled_but_not_completed() {
        let mut job = Job::new("t");
        assert!(job
            .apply(JobTransition::Complete {
                output: PathBuf::from("/o.mp4")
            })
            .is_err());
        job.apply(JobTransition::Cancel {
            reason: String::new(),
        })
        .unwrap();
        assert_eq!(job.message, "Cancelled");
    }

    #[test]
    fn test_fail_records_error() {
        let mut job = processing();
        job.apply(JobTransition::Fail {
            error: "Engine exited with code 1: bad filter".to_string(),
        })
        .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error.as_deref(),
            Some("Engine exited with code 1: bad filter")
        );
        assert!(job.message.contains("bad filter"));
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!("Processing".parse::<JobStatus>(), Ok(JobStatus::Processing));
        assert!("done".parse::<JobStatus>().is_err());
    }
}
