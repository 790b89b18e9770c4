//! Keyed job store — the single owner of all job records.
//!
//! Every mutation happens under one write lock, so observers never see
//! a record mixing old and new data, and a record that reached a
//! terminal state is never mutated again.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{Job, JobError, JobResult, JobStatus, JobSummary};

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Job was still queued; it went terminal without any work starting.
    CancelledImmediately,
    /// Job is running; the pipeline will observe the flag between stages.
    CancelRequested,
    /// Job already finished; nothing to cancel.
    AlreadyTerminal,
}

#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Newest-first summaries, optionally filtered by status.
    pub async fn list(&self, filter: Option<JobStatus>) -> Vec<JobSummary> {
        let jobs = self.jobs.read().await;
        let mut summaries: Vec<JobSummary> = jobs
            .values()
            .filter(|job| filter.map_or(true, |status| job.status == status))
            .map(JobSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Claims a queued job for execution. Returns the running snapshot,
    /// or `None` when the job is unknown or no longer queued (e.g.
    /// cancelled while waiting) — the worker then skips it.
    pub async fn mark_running(&self, id: Uuid) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id)?;
        if job.status != JobStatus::Queued {
            return None;
        }
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        job.message = "job running".to_string();
        Some(job.clone())
    }

    pub async fn complete(&self, id: Uuid, result: JobResult) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            if job.status.is_terminal() {
                return;
            }
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
            job.message = format!(
                "job completed: {}/{} candidates passed",
                result.passed_candidates, result.total_candidates
            );
            job.result = Some(result);
        }
    }

    pub async fn fail(&self, id: Uuid, error: JobError) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            if job.status.is_terminal() {
                return;
            }
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            job.message = format!("job failed: {}", error.message);
            job.error = Some(error);
        }
    }

    pub async fn request_cancel(&self, id: Uuid) -> Option<CancelOutcome> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id)?;
        Some(match job.status {
            JobStatus::Queued => {
                job.status = JobStatus::Failed;
                job.completed_at = Some(Utc::now());
                let error = JobError::cancelled("cancelled before execution started");
                job.message = format!("job failed: {}", error.message);
                job.error = Some(error);
                CancelOutcome::CancelledImmediately
            }
            JobStatus::Running => {
                job.cancel_requested = true;
                CancelOutcome::CancelRequested
            }
            JobStatus::Completed | JobStatus::Failed => CancelOutcome::AlreadyTerminal,
        })
    }

    pub async fn cancel_requested(&self, id: Uuid) -> bool {
        self.jobs
            .read()
            .await
            .get(&id)
            .map(|job| job.cancel_requested)
            .unwrap_or(false)
    }

    /// Progress supplement only — never changes status.
    pub async fn set_message(&self, id: Uuid, message: String) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            if !job.status.is_terminal() {
                job.message = message;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{JobErrorKind, JobRequest, ProcessingStats, SearchMethod};

    fn new_job() -> Job {
        Job::new(JobRequest {
            job_description: "Senior Rust engineer wanted".to_string(),
            search_method: SearchMethod::StructuredApi,
            limit: 3,
        })
    }

    fn result_for(id: Uuid) -> JobResult {
        JobResult {
            job_id: id,
            candidates: vec![],
            total_candidates: 3,
            passed_candidates: 2,
            pass_rate: "66.7%".to_string(),
            search_method: SearchMethod::StructuredApi,
            cached: false,
            stats: ProcessingStats::default(),
        }
    }

    #[tokio::test]
    async fn test_mark_running_claims_only_queued_jobs() {
        let store = JobStore::new();
        let job = new_job();
        let id = job.id;
        store.insert(job).await;

        assert!(store.mark_running(id).await.is_some());
        // Second claim must fail — the job is no longer queued.
        assert!(store.mark_running(id).await.is_none());
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_cancel_queued_job_goes_terminal_immediately() {
        let store = JobStore::new();
        let job = new_job();
        let id = job.id;
        store.insert(job).await;

        let outcome = store.request_cancel(id).await.unwrap();
        assert_eq!(outcome, CancelOutcome::CancelledImmediately);

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_ref().unwrap().kind, JobErrorKind::Cancelled);
        // A worker dequeuing it later cannot claim it.
        assert!(store.mark_running(id).await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_running_job_sets_flag_only() {
        let store = JobStore::new();
        let job = new_job();
        let id = job.id;
        store.insert(job).await;
        store.mark_running(id).await.unwrap();

        let outcome = store.request_cancel(id).await.unwrap();
        assert_eq!(outcome, CancelOutcome::CancelRequested);
        assert!(store.cancel_requested(id).await);
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_immutable() {
        let store = JobStore::new();
        let job = new_job();
        let id = job.id;
        store.insert(job).await;
        store.mark_running(id).await.unwrap();
        store.complete(id, result_for(id)).await;

        store
            .fail(id, JobError::new(JobErrorKind::Timeout, "too late"))
            .await;
        store.set_message(id, "should not apply".to_string()).await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
        assert!(job.message.contains("completed"));
        assert_eq!(
            store.request_cancel(id).await.unwrap(),
            CancelOutcome::AlreadyTerminal
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let store = JobStore::new();
        let queued = new_job();
        let running = new_job();
        let running_id = running.id;
        store.insert(queued).await;
        store.insert(running).await;
        store.mark_running(running_id).await.unwrap();

        assert_eq!(store.list(None).await.len(), 2);
        let only_running = store.list(Some(JobStatus::Running)).await;
        assert_eq!(only_running.len(), 1);
        assert_eq!(only_running[0].job_id, running_id);
    }
}
