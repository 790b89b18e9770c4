//! Job lifecycle model.
//!
//! Jobs are owned exclusively by the `JobStore`; the pipeline only ever
//! borrows one for the duration of a run. Once a job reaches a terminal
//! state its record is never mutated again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::candidate::ScoredCandidate;

/// Which extraction variant a job uses. Selected once at submission,
/// never re-selected mid-job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    StructuredApi,
    Crawler,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::StructuredApi => "structured_api",
            SearchMethod::Crawler => "crawler",
        }
    }
}

/// Submission payload for a sourcing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_description: String,
    pub search_method: SearchMethod,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

pub const MIN_DESCRIPTION_LEN: usize = 10;
pub const MAX_LIMIT: usize = 50;

impl JobRequest {
    /// Rejects malformed submissions before they are enqueued.
    pub fn validate(&self) -> Result<(), String> {
        if self.job_description.trim().len() < MIN_DESCRIPTION_LEN {
            return Err(format!(
                "job description must be at least {MIN_DESCRIPTION_LEN} characters long"
            ));
        }
        if self.limit < 1 || self.limit > MAX_LIMIT {
            return Err(format!("limit must be between 1 and {MAX_LIMIT}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    Fatal,
    Cancelled,
    Timeout,
    Panic,
}

/// Structured error payload stored on failed jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::new(JobErrorKind::Cancelled, reason)
    }
}

/// A sourcing job as tracked by the queue and surfaced by the status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub request: JobRequest,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Human-readable progress message, updated at each pipeline stage.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip)]
    pub cancel_requested: bool,
}

impl Job {
    pub fn new(request: JobRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            message: "job queued for processing".to_string(),
            error: None,
            result: None,
            cancel_requested: false,
        }
    }

    /// Builds an already-completed job from a cached result — the
    /// submit-time fast path when an identical request is still live in
    /// the result cache.
    pub fn completed_from_cache(request: JobRequest, mut cached: JobResult) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        cached.job_id = id;
        cached.cached = true;
        Self {
            id,
            request,
            status: JobStatus::Completed,
            created_at: now,
            started_at: Some(now),
            completed_at: Some(now),
            message: "job completed immediately (cached results)".to_string(),
            error: None,
            result: Some(cached),
            cancel_requested: false,
        }
    }
}

/// Timing and drop counters gathered while a job runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub search_secs: f64,
    pub scoring_secs: f64,
    pub search_query: String,
    /// Records dropped for missing a name or profile identity.
    pub malformed_dropped: usize,
    pub enrichment_failures: usize,
}

/// The final ranked artifact for a completed job. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    /// Sorted by overall_score descending; ties keep extraction order.
    pub candidates: Vec<ScoredCandidate>,
    pub total_candidates: usize,
    pub passed_candidates: usize,
    /// One-decimal percent string, e.g. "100.0%".
    pub pass_rate: String,
    pub search_method: SearchMethod,
    pub cached: bool,
    pub stats: ProcessingStats,
}

/// Compact row for the job-listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub total_candidates: usize,
    pub passed_candidates: usize,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        let (total, passed) = job
            .result
            .as_ref()
            .map(|r| (r.total_candidates, r.passed_candidates))
            .unwrap_or((0, 0));
        Self {
            job_id: job.id,
            status: job.status,
            created_at: job.created_at,
            completed_at: job.completed_at,
            total_candidates: total,
            passed_candidates: passed,
        }
    }
}
