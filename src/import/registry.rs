//! In-memory job registry.
//!
//! Process-wide map from job id to job state, injected through Rocket state
//! rather than reached as a global. The pipeline task that created an entry
//! is its only writer; the progress endpoints only read snapshots. Entries
//! live for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::{ImportJob, JobTotals};

struct JobEntry {
    job: ImportJob,
    cancel: CancellationToken,
}

#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<Uuid, JobEntry>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job and hand back its cancellation token. The token is
    /// checked at every suspension point of the pipeline and fired when the
    /// job reaches a terminal state, waking any in-flight pacing delay.
    pub fn create(&self, job: ImportJob) -> CancellationToken {
        let token = CancellationToken::new();
        self.jobs.lock().insert(
            job.id,
            JobEntry {
                job,
                cancel: token.clone(),
            },
        );
        token
    }

    /// Current state of one job, cloned out from under the lock.
    pub fn snapshot(&self, id: &Uuid) -> Option<ImportJob> {
        self.jobs.lock().get(id).map(|entry| entry.job.clone())
    }

    /// All known jobs, newest first.
    pub fn snapshots(&self) -> Vec<ImportJob> {
        let mut jobs: Vec<ImportJob> = self
            .jobs
            .lock()
            .values()
            .map(|entry| entry.job.clone())
            .collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }

    /// Apply one atomic mutation to a running job's totals. Terminal jobs
    /// are immutable; updates against them are dropped.
    pub fn update<F>(&self, id: &Uuid, apply: F)
    where
        F: FnOnce(&mut JobTotals),
    {
        let mut jobs = self.jobs.lock();
        if let Some(entry) = jobs.get_mut(id) {
            if entry.job.is_terminal() {
                return;
            }
            apply(&mut entry.job.totals);
            entry.job.updated_at = Utc::now();
        }
    }

    /// Transition `running -> done`.
    pub fn complete(&self, id: &Uuid) {
        let mut jobs = self.jobs.lock();
        if let Some(entry) = jobs.get_mut(id) {
            entry.job.mark_done();
            entry.cancel.cancel();
        }
    }

    /// Transition `running -> error` with the failure message.
    pub fn fail(&self, id: &Uuid, message: String) {
        let mut jobs = self.jobs.lock();
        if let Some(entry) = jobs.get_mut(id) {
            entry.job.mark_error(message);
            entry.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;

    fn new_job() -> ImportJob {
        ImportJob::new(
            "pool-7".to_string(),
            "owner-1".to_string(),
            Some("tag".to_string()),
            None,
        )
    }

    #[test]
    fn test_create_and_snapshot() {
        let registry = JobRegistry::new();
        let job = new_job();
        let id = job.id;

        registry.create(job);

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.totals.seen, 0);
    }

    #[test]
    fn test_snapshot_unknown_id_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.snapshot(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_update_mutates_totals_and_bumps_updated_at() {
        let registry = JobRegistry::new();
        let job = new_job();
        let id = job.id;
        let created_at = job.updated_at;
        registry.create(job);

        registry.update(&id, |totals| {
            totals.seen += 1;
            totals.valid += 1;
        });

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.totals.seen, 1);
        assert_eq!(snapshot.totals.valid, 1);
        assert!(snapshot.updated_at >= created_at);
    }

    #[test]
    fn test_complete_cancels_token_and_finishes() {
        let registry = JobRegistry::new();
        let job = new_job();
        let id = job.id;
        let token = registry.create(job);

        registry.complete(&id);

        assert_eq!(registry.snapshot(&id).unwrap().status, JobStatus::Done);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_fail_records_error_message() {
        let registry = JobRegistry::new();
        let job = new_job();
        let id = job.id;
        registry.create(job);

        registry.fail(&id, "first page fetch failed".to_string());

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.error.as_deref(), Some("first page fetch failed"));
    }

    #[test]
    fn test_terminal_jobs_are_immutable() {
        let registry = JobRegistry::new();
        let job = new_job();
        let id = job.id;
        registry.create(job);
        registry.complete(&id);

        registry.update(&id, |totals| totals.seen += 100);
        registry.fail(&id, "too late".to_string());

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Done);
        assert_eq!(snapshot.totals.seen, 0);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_snapshots_lists_all_jobs() {
        let registry = JobRegistry::new();
        registry.create(new_job());
        registry.create(new_job());

        assert_eq!(registry.snapshots().len(), 2);
    }
}
