//! Job queue — submission, status, cancellation, and the worker pool.

pub mod pool;
pub mod store;

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::cache::{request_fingerprint, ResultCache};
use crate::errors::AppError;
use crate::jobs::pool::JobReceiver;
use crate::jobs::store::{CancelOutcome, JobStore};
use crate::models::job::{Job, JobRequest};

/// Submission front of the queue. Validation failures are rejected here,
/// before anything is enqueued; once a submission is accepted, failures
/// only surface through status/result retrieval.
pub struct JobQueue {
    store: Arc<JobStore>,
    cache: Arc<ResultCache>,
    sender: mpsc::UnboundedSender<Uuid>,
}

impl JobQueue {
    pub fn new(store: Arc<JobStore>, cache: Arc<ResultCache>) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                store,
                cache,
                sender,
            },
            receiver,
        )
    }

    /// Enqueues a job and returns it immediately — or, when an
    /// identical request is still live in the result cache, returns a
    /// job that is already `Completed` with the cached result, without
    /// invoking any extraction capability.
    pub async fn submit(&self, request: JobRequest) -> Result<Job, AppError> {
        request.validate().map_err(AppError::Validation)?;

        let fingerprint = request_fingerprint(&request);
        if let Some(cached) = self.cache.get_job_result(&fingerprint).await {
            let job = Job::completed_from_cache(request, cached);
            self.store.insert(job.clone()).await;
            return Ok(job);
        }

        let job = Job::new(request);
        self.store.insert(job.clone()).await;
        self.sender
            .send(job.id)
            .map_err(|_| AppError::Internal(anyhow!("worker pool is not running")))?;
        Ok(job)
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<CancelOutcome, AppError> {
        self.store
            .request_cancel(job_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))
    }

    /// Drops the cached result for a job's request fingerprint, forcing
    /// the next identical submission to run the pipeline again.
    pub async fn delete_cache(&self, job_id: Uuid) -> Result<bool, AppError> {
        let job = self
            .store
            .get(job_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))?;
        let fingerprint = request_fingerprint(&job.request);
        Ok(self.cache.remove_job_result(&fingerprint).await)
    }
}
