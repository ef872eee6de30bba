//! Job storage.

use std::collections::HashMap;
use std::sync::RwLock;

use super::error::JobError;
use super::types::{Job, JobStatus, JobTransition};

/// Filter for listing jobs.
#[derive(Debug, Clone)]
pub struct JobFilter {
    /// Only jobs in this status.
    pub status: Option<JobStatus>,
    /// Maximum number of results.
    pub limit: usize,
    /// Offset for pagination.
    pub offset: usize,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl JobFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    fn matches(&self, job: &Job) -> bool {
        self.status.map_or(true, |s| job.status == s)
    }
}

/// Owned, internally synchronized job registry.
///
/// Every operation is atomic with respect to the others; in particular
/// `update_state` checks and applies a transition under one lock.
pub trait JobStore: Send + Sync {
    /// Create a pending job.
    fn create(&self, title: &str) -> Result<Job, JobError>;

    /// Get a job by ID.
    fn get(&self, id: &str) -> Result<Option<Job>, JobError>;

    /// List jobs matching the filter, newest first.
    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError>;

    /// Count jobs matching the filter, ignoring limit and offset.
    fn count(&self, filter: &JobFilter) -> Result<usize, JobError>;

    /// Apply a transition and return the updated job.
    fn update_state(&self, id: &str, transition: JobTransition) -> Result<Job, JobError>;
}

#[derive(Debug, Default)]
struct Registry {
    jobs: HashMap<String, Job>,
    /// Ids in creation order.
    order: Vec<String>,
}

/// [`JobStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: RwLock<Registry>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, title: &str) -> Result<Job, JobError> {
        let job = Job::new(title);
        let mut registry = self.inner.write().map_err(|_| JobError::LockPoisoned)?;
        registry.order.push(job.id.clone());
        registry.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobError> {
        let registry = self.inner.read().map_err(|_| JobError::LockPoisoned)?;
        Ok(registry.jobs.get(id).cloned())
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError> {
        let registry = self.inner.read().map_err(|_| JobError::LockPoisoned)?;
        Ok(registry
            .order
            .iter()
            .rev()
            .filter_map(|id| registry.jobs.get(id))
            .filter(|job| filter.matches(job))
            .skip(filter.offset)
            .take(filter.limit)
            .cloned()
            .collect())
    }

    fn count(&self, filter: &JobFilter) -> Result<usize, JobError> {
        let registry = self.inner.read().map_err(|_| JobError::LockPoisoned)?;
        Ok(registry.jobs.values().filter(|job| filter.matches(job)).count())
    }

    fn update_state(&self, id: &str, transition: JobTransition) -> Result<Job, JobError> {
        let mut registry = self.inner.write().map_err(|_| JobError::LockPoisoned)?;
        let job = registry
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        job.apply(transition)?;
        Ok(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_create_and_get() {
        let store = InMemoryJobStore::new();
        let job = store.create("first").unwrap();
        let fetched = store.get(&job.id).unwrap().unwrap();
        assert_eq!(fetched, job);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_with_paging() {
        let store = InMemoryJobStore::new();
        let ids: Vec<String> = (0..5)
            .map(|i| store.create(&format!("job {}", i)).unwrap().id)
            .collect();

        let all = store.list(&JobFilter::new()).unwrap();
        assert_eq!(all.first().map(|j| &j.id), ids.last());

        let page = store
            .list(&JobFilter::new().with_offset(1).with_limit(2))
            .unwrap();
        let page_ids: Vec<_> = page.iter().map(|j| j.id.clone()).collect();
        assert_eq!(page_ids, vec![ids[3].clone(), ids[2].clone()]);
    }

    #[test]
    fn test_filter_by_status() {
        let store = InMemoryJobStore::new();
        let a = store.create("a").unwrap();
        store.create("b").unwrap();
        store.update_state(&a.id, JobTransition::Start).unwrap();

        let filter = JobFilter::new().with_status(JobStatus::Processing);
        let processing = store.list(&filter).unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, a.id);
        assert_eq!(store.count(&filter).unwrap(), 1);
        assert_eq!(store.count(&JobFilter::new()).unwrap(), 2);
    }

    #[test]
    fn test_update_missing_job() {
        let store = InMemoryJobStore::new();
        assert!(matches!(
            store.update_state("nope", JobTransition::Start),
            Err(JobError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejected_transition_leaves_record() {
        let store = InMemoryJobStore::new();
        let job = store.create("a").unwrap();
        store.update_state(&job.id, JobTransition::Start).unwrap();
        store
            .update_state(
                &job.id,
                JobTransition::Cancel {
                    reason: "stop".to_string(),
                },
            )
            .unwrap();

        let result = store.update_state(
            &job.id,
            JobTransition::Complete {
                output: PathBuf::from("/o.mp4"),
            },
        );
        assert!(matches!(result, Err(JobError::InvalidTransition { .. })));
        assert_eq!(
            store.get(&job.id).unwrap().unwrap().status,
            JobStatus::Cancelled
        );
    }

    #[test]
    fn test_concurrent_transitions_pick_one_winner() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = store.create("race").unwrap();
        store.update_state(&job.id, JobTransition::Start).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let id = job.id.clone();
                std::thread::spawn(move || {
                    let transition = if i % 2 == 0 {
                        JobTransition::Cancel {
                            reason: "stop".to_string(),
                        }
                    } else {
                        JobTransition::Complete {
                            output: PathBuf::from("/o.mp4"),
                        }
                    };
                    store.update_state(&id, transition).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }
}
