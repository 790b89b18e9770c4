//! Job endpoints: submit, status, results, list, cancel, cache purge.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::store::CancelOutcome;
use crate::models::job::{Job, JobRequest, JobResult, JobStatus, JobSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
    /// Present only on the cached fast path, when results are already
    /// available at submission time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JobResult>,
}

/// POST /api/jobs
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let job = state.queue.submit(request).await?;
    Ok(Json(SubmitResponse {
        job_id: job.id,
        status: job.status,
        message: job.message,
        data: job.result,
    }))
}

/// GET /api/jobs/:id
pub async fn handle_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("job {id} not found")))?;
    Ok(Json(job))
}

/// GET /api/jobs/:id/results
pub async fn handle_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResult>, AppError> {
    let job = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("job {id} not found")))?;

    match job.status {
        JobStatus::Completed => job
            .result
            .map(Json)
            .ok_or_else(|| AppError::NotFound(format!("results for job {id} not found"))),
        status => Err(AppError::Validation(format!(
            "job is not completed yet; current status: {}",
            status.as_str()
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<JobStatus>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total_jobs: usize,
    pub status_filter: Option<JobStatus>,
    pub jobs: Vec<JobSummary>,
}

/// GET /api/jobs?status=
pub async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let jobs = state.store.list(query.status).await;
    Ok(Json(ListResponse {
        total_jobs: jobs.len(),
        status_filter: query.status,
        jobs,
    }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: Uuid,
    pub outcome: &'static str,
}

/// POST /api/jobs/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let outcome = state.queue.cancel(id).await?;
    Ok(Json(CancelResponse {
        job_id: id,
        outcome: match outcome {
            CancelOutcome::CancelledImmediately => "cancelled",
            CancelOutcome::CancelRequested => "cancel_requested",
            CancelOutcome::AlreadyTerminal => "already_terminal",
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteCacheResponse {
    pub job_id: Uuid,
    pub deleted: bool,
}

/// DELETE /api/jobs/:id/cache
pub async fn handle_delete_cache(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteCacheResponse>, AppError> {
    let deleted = state.queue.delete_cache(id).await?;
    Ok(Json(DeleteCacheResponse {
        job_id: id,
        deleted,
    }))
}
