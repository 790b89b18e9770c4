//! Durable artifacts written at the assembling stage, independent of
//! the in-process cache: one JSON document per candidate (refreshed
//! only when the existing copy is older than the freshness window) and
//! one timestamped batch summary per completed job.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use crate::models::candidate::{slugify, ScoredCandidate};
use crate::models::job::JobResult;

/// Default freshness window for per-candidate documents.
pub const CANDIDATE_REFRESH_AFTER: Duration = Duration::from_secs(7 * 24 * 3600);

pub struct ArtifactWriter {
    output_dir: PathBuf,
    refresh_after: Duration,
}

impl ArtifactWriter {
    pub fn new(output_dir: PathBuf, refresh_after: Duration) -> Self {
        Self {
            output_dir,
            refresh_after,
        }
    }

    /// Writes all artifacts for a finished job. Failures are logged and
    /// swallowed — persistence problems never fail the job.
    pub async fn persist(&self, result: &JobResult) {
        for candidate in &result.candidates {
            if let Err(e) = self.write_candidate(candidate).await {
                warn!(
                    "failed to persist profile for {}: {e:#}",
                    candidate.enriched.candidate.name
                );
            }
        }
        if let Err(e) = self.write_summary(result).await {
            warn!("failed to persist summary for job {}: {e:#}", result.job_id);
        }
    }

    /// `<output_dir>/profiles/{name}-{identity}.json`, skipped while a
    /// fresh copy exists.
    async fn write_candidate(&self, candidate: &ScoredCandidate) -> Result<()> {
        let dir = self.output_dir.join("profiles");
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let path = dir.join(candidate_filename(candidate));
        if is_fresh(&path, self.refresh_after).await {
            debug!("profile {} is fresh, not rewriting", path.display());
            return Ok(());
        }

        let payload = serde_json::to_vec_pretty(candidate)?;
        tokio::fs::write(&path, payload)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// `<output_dir>/results/job-{id}-{timestamp}.json`.
    async fn write_summary(&self, result: &JobResult) -> Result<()> {
        let dir = self.output_dir.join("results");
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("job-{}-{stamp}.json", result.job_id));
        let payload = serde_json::to_vec_pretty(result)?;
        tokio::fs::write(&path, payload)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

fn candidate_filename(candidate: &ScoredCandidate) -> String {
    let inner = &candidate.enriched.candidate;
    let identity = inner
        .identity()
        .rsplit('/')
        .next()
        .map(slugify)
        .unwrap_or_default();
    let name = slugify(&inner.name);
    if identity.is_empty() {
        format!("{name}.json")
    } else {
        format!("{name}-{identity}.json")
    }
}

async fn is_fresh(path: &Path, refresh_after: Duration) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map(|age| age < refresh_after)
            .unwrap_or(false),
        Err(_) => false,
    }
}
