//! Worker pool — N tokio tasks draining the FIFO job channel.
//!
//! Each worker claims a job, runs the pipeline inside its own spawned
//! task (so a panic is caught at this boundary as a `JoinError` instead
//! of taking the worker down), and enforces the per-job wall-clock
//! budget. Exactly one terminal transition is written per claimed job;
//! a fault in one job never affects siblings.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::jobs::store::JobStore;
use crate::models::job::{JobError, JobErrorKind};
use crate::pipeline::Pipeline;

pub type JobReceiver = mpsc::UnboundedReceiver<Uuid>;

/// Spawns `count` workers sharing one receiver. Workers exit when the
/// submission side of the channel is dropped.
pub fn spawn_workers(
    count: usize,
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    receiver: JobReceiver,
    job_timeout: Duration,
) -> Vec<JoinHandle<()>> {
    assert!(count > 0, "worker count must be > 0");
    let receiver = Arc::new(Mutex::new(receiver));
    (0..count)
        .map(|worker_id| {
            let store = store.clone();
            let pipeline = pipeline.clone();
            let receiver = receiver.clone();
            tokio::spawn(async move {
                run_worker(worker_id, store, pipeline, receiver, job_timeout).await;
            })
        })
        .collect()
}

async fn run_worker(
    worker_id: usize,
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    receiver: Arc<Mutex<JobReceiver>>,
    job_timeout: Duration,
) {
    debug!("worker {worker_id} started");

    loop {
        // Lock only for the dequeue so siblings keep draining.
        let job_id = {
            let mut rx = receiver.lock().await;
            match rx.recv().await {
                Some(id) => id,
                None => break,
            }
        };

        // Cancelled-while-queued (or otherwise non-queued) jobs are
        // skipped without touching any capability.
        let Some(job) = store.mark_running(job_id).await else {
            debug!("worker {worker_id}: job {job_id} not claimable, skipping");
            continue;
        };

        info!(
            "worker {worker_id}: running job {job_id} ({}, limit {})",
            job.request.search_method.as_str(),
            job.request.limit
        );

        let run = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(&job).await })
        };
        let abort = run.abort_handle();

        match tokio::time::timeout(job_timeout, run).await {
            Err(_) => {
                // Budget exceeded: abandon the pipeline future. Pending
                // candidate calls are dropped and their gate permits
                // released by drop.
                abort.abort();
                store
                    .fail(
                        job_id,
                        JobError::new(
                            JobErrorKind::Timeout,
                            format!(
                                "job exceeded wall-clock budget of {}s",
                                job_timeout.as_secs()
                            ),
                        ),
                    )
                    .await;
            }
            Ok(Err(join_err)) => {
                error!("worker {worker_id}: job {job_id} execution fault: {join_err}");
                store
                    .fail(
                        job_id,
                        JobError::new(
                            JobErrorKind::Panic,
                            format!("job execution fault: {join_err}"),
                        ),
                    )
                    .await;
            }
            Ok(Ok(Ok(result))) => {
                store.complete(job_id, result).await;
            }
            Ok(Ok(Err(PipelineError::Cancelled(reason)))) => {
                store.fail(job_id, JobError::cancelled(reason)).await;
            }
            Ok(Ok(Err(PipelineError::Fatal(message)))) => {
                store
                    .fail(job_id, JobError::new(JobErrorKind::Fatal, message))
                    .await;
            }
        }
    }

    debug!("worker {worker_id} stopped");
}
