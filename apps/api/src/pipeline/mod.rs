//! Pipeline coordinator — runs one job through
//! `fetching_keywords → extracting → enriching → scoring → assembling`.
//!
//! Stages are strictly sequential per job; within enriching and scoring
//! the candidates fan out concurrently (actual parallelism bounded by
//! the per-capability gate) and the stage joins every in-flight task
//! before advancing. A cancellation flag set on the job record is
//! observed between stages; in-flight work is allowed to finish but its
//! results are discarded.

pub mod persist;

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{request_fingerprint, ResultCache};
use crate::enrichment::EnrichmentStage;
use crate::errors::PipelineError;
use crate::gate::{Capability, ConcurrencyGate};
use crate::jobs::store::JobStore;
use crate::models::candidate::{
    Candidate, EnrichedCandidate, EnrichmentStatus, Recommendation, ScoreBreakdown,
    ScoredCandidate,
};
use crate::models::job::{Job, JobResult, ProcessingStats};
use crate::retry::RetryPolicy;
use crate::scoring::ScoringStage;
use crate::search::keywords::KeywordGenerator;
use crate::search::ExtractionRouter;

use self::persist::ArtifactWriter;

pub struct Pipeline {
    keyword_generator: Arc<dyn KeywordGenerator>,
    router: ExtractionRouter,
    enrichment: Arc<EnrichmentStage>,
    scoring: Arc<ScoringStage>,
    cache: Arc<ResultCache>,
    store: Arc<JobStore>,
    gate: Arc<ConcurrencyGate>,
    artifacts: ArtifactWriter,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        keyword_generator: Arc<dyn KeywordGenerator>,
        router: ExtractionRouter,
        enrichment: Arc<EnrichmentStage>,
        scoring: Arc<ScoringStage>,
        cache: Arc<ResultCache>,
        store: Arc<JobStore>,
        gate: Arc<ConcurrencyGate>,
        artifacts: ArtifactWriter,
    ) -> Self {
        Self {
            keyword_generator,
            router,
            enrichment,
            scoring,
            cache,
            store,
            gate,
            artifacts,
        }
    }

    pub async fn run(&self, job: &Job) -> Result<JobResult, PipelineError> {
        let request = &job.request;

        // ── fetching_keywords ───────────────────────────────────────
        self.enter_stage(job.id, "fetching_keywords").await?;
        let keywords = {
            let _permit = self.gate.acquire(Capability::Keywords).await;
            RetryPolicy::extraction()
                .run("generate_keywords", || {
                    self.keyword_generator.generate(&request.job_description)
                })
                .await
                .map_err(|e| {
                    PipelineError::Fatal(format!("keyword generation unavailable: {e}"))
                })?
        };
        info!(job = %job.id, title = %keywords.title, "keywords generated");

        // ── extracting ──────────────────────────────────────────────
        self.enter_stage(job.id, "extracting").await?;
        let search_started = Instant::now();
        let (candidates, extraction) = self
            .router
            .extract(&keywords, request.search_method, request.limit)
            .await;
        let search_secs = search_started.elapsed().as_secs_f64();

        if candidates.is_empty() {
            return Err(PipelineError::Fatal(
                "extraction produced zero usable candidates after all retries".to_string(),
            ));
        }

        // ── enriching ───────────────────────────────────────────────
        self.enter_stage(job.id, "enriching").await?;
        let enriched = self.enrich_all(candidates).await;
        let enrichment_failures = enriched
            .iter()
            .filter(|e| e.enrichment_status == EnrichmentStatus::Failed)
            .count();

        // ── scoring ─────────────────────────────────────────────────
        self.enter_stage(job.id, "scoring").await?;
        let scoring_started = Instant::now();
        let scored = self.score_all(enriched, &request.job_description).await;
        let scoring_secs = scoring_started.elapsed().as_secs_f64();

        // ── assembling ──────────────────────────────────────────────
        self.enter_stage(job.id, "assembling").await?;
        let result = assemble(
            job,
            scored,
            ProcessingStats {
                search_secs,
                scoring_secs,
                search_query: keywords.search_query(self.router.profile_site()),
                malformed_dropped: extraction.malformed_dropped,
                enrichment_failures,
            },
        );

        self.cache
            .put_job_result(request_fingerprint(request), result.clone())
            .await;
        self.artifacts.persist(&result).await;

        info!(
            job = %job.id,
            total = result.total_candidates,
            passed = result.passed_candidates,
            "pipeline complete"
        );
        Ok(result)
    }

    /// Stage gatekeeper: observes the cancellation flag and publishes
    /// the progress message.
    async fn enter_stage(&self, job_id: Uuid, stage: &str) -> Result<(), PipelineError> {
        if self.store.cancel_requested(job_id).await {
            return Err(PipelineError::Cancelled(
                "cancellation requested by caller".to_string(),
            ));
        }
        self.store
            .set_message(job_id, format!("stage: {stage}"))
            .await;
        info!(job = %job_id, stage, "entering stage");
        Ok(())
    }

    /// Fan-out/fan-in over the enrichment stage. Join order follows
    /// spawn order, so extraction order is preserved.
    async fn enrich_all(&self, candidates: Vec<Candidate>) -> Vec<EnrichedCandidate> {
        let handles: Vec<_> = candidates
            .into_iter()
            .map(|candidate| {
                let stage = self.enrichment.clone();
                let fallback = candidate.clone();
                (
                    fallback,
                    tokio::spawn(async move { stage.enrich(candidate).await }),
                )
            })
            .collect();

        let mut enriched = Vec::with_capacity(handles.len());
        for (fallback, handle) in handles {
            match handle.await {
                Ok(result) => enriched.push(result),
                Err(e) => {
                    warn!("enrichment task for {} died: {e}", fallback.name);
                    enriched.push(EnrichedCandidate::unenriched(
                        fallback,
                        EnrichmentStatus::Failed,
                    ));
                }
            }
        }
        enriched
    }

    /// Fan-out/fan-in over the scoring stage, same ordering rule.
    async fn score_all(
        &self,
        candidates: Vec<EnrichedCandidate>,
        requirements: &str,
    ) -> Vec<ScoredCandidate> {
        let handles: Vec<_> = candidates
            .into_iter()
            .map(|enriched| {
                let stage = self.scoring.clone();
                let requirements = requirements.to_string();
                let fallback = enriched.clone();
                (
                    fallback,
                    tokio::spawn(async move { stage.score(enriched, &requirements).await }),
                )
            })
            .collect();

        let mut scored = Vec::with_capacity(handles.len());
        for (fallback, handle) in handles {
            match handle.await {
                Ok(result) => scored.push(result),
                Err(e) => {
                    warn!("scoring task for {} died: {e}", fallback.candidate.name);
                    scored.push(ScoredCandidate {
                        enriched: fallback,
                        dimension_scores: ScoreBreakdown::default(),
                        overall_score: 0.0,
                        recommendation: Recommendation::NoMatch,
                        passed: false,
                        outreach_message: None,
                        scoring_error: Some(format!("scoring task died: {e}")),
                    });
                }
            }
        }
        scored
    }
}

/// Sorts, counts, and freezes the final artifact. The sort is stable,
/// so equal scores keep their extraction order.
fn assemble(job: &Job, mut scored: Vec<ScoredCandidate>, stats: ProcessingStats) -> JobResult {
    scored.sort_by(|a, b| {
        b.overall_score
            .partial_cmp(&a.overall_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_candidates = scored.len();
    let passed_candidates = scored.iter().filter(|c| c.passed).count();
    let pass_rate = format!(
        "{:.1}%",
        passed_candidates as f64 / total_candidates as f64 * 100.0
    );

    JobResult {
        job_id: job.id,
        candidates: scored,
        total_candidates,
        passed_candidates,
        pass_rate,
        search_method: job.request.search_method,
        cached: false,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::EnrichmentStatus;
    use crate::models::job::{JobRequest, SearchMethod};
    use crate::testing::{scored_with, TestHarness};

    fn job_with(limit: usize) -> Job {
        Job::new(JobRequest {
            job_description: "Senior Rust engineer, fintech, Berlin".to_string(),
            search_method: SearchMethod::StructuredApi,
            limit,
        })
    }

    #[test]
    fn test_assemble_sorts_descending_with_stable_ties() {
        let job = job_with(4);
        let scored = vec![
            scored_with("a", 7.0),
            scored_with("b", 9.0),
            scored_with("c", 7.0),
            scored_with("d", 8.0),
        ];
        let result = assemble(&job, scored, ProcessingStats::default());

        let order: Vec<&str> = result
            .candidates
            .iter()
            .map(|c| c.enriched.candidate.name.as_str())
            .collect();
        // Ties (a, c at 7.0) keep extraction order.
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_assemble_pass_rate_formula() {
        let job = job_with(4);
        let scored = vec![
            scored_with("a", 9.0),
            scored_with("b", 8.0),
            scored_with("c", 5.0),
            scored_with("d", 2.0),
        ];
        let result = assemble(&job, scored, ProcessingStats::default());

        assert_eq!(result.total_candidates, 4);
        assert_eq!(result.passed_candidates, 2);
        assert_eq!(result.pass_rate, "50.0%");

        let ratio: f64 = result.pass_rate.trim_end_matches('%').parse().unwrap();
        let expected = result.passed_candidates as f64 / result.total_candidates as f64 * 100.0;
        assert!((ratio - expected).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_run_produces_ranked_result() {
        let harness = TestHarness::new().with_profiles(3).with_uniform_score(9.0);
        let pipeline = harness.pipeline();
        let job = job_with(3);
        harness.store.insert(job.clone()).await;

        let result = pipeline.run(&job).await.unwrap();

        assert_eq!(result.total_candidates, 3);
        assert_eq!(result.passed_candidates, 3);
        assert_eq!(result.pass_rate, "100.0%");
        for window in result.candidates.windows(2) {
            assert!(window[0].overall_score >= window[1].overall_score);
        }
        for candidate in &result.candidates {
            assert!((0.0..=10.0).contains(&candidate.overall_score));
        }
    }

    #[tokio::test]
    async fn test_zero_candidates_is_fatal_not_empty_success() {
        let harness = TestHarness::new().with_profiles(0);
        let pipeline = harness.pipeline();
        let job = job_with(3);
        harness.store.insert(job.clone()).await;

        let err = pipeline.run(&job).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fatal(_)));
    }

    #[tokio::test]
    async fn test_keyword_outage_is_fatal() {
        let harness = TestHarness::new().with_profiles(3).with_keyword_outage();
        let pipeline = harness.pipeline();
        let job = job_with(3);
        harness.store.insert(job.clone()).await;

        let err = pipeline.run(&job).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fatal(_)));
        // Extraction must never have been consulted.
        assert_eq!(harness.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_enrichment_outage_never_blocks_scoring() {
        let harness = TestHarness::new()
            .with_profiles(2)
            .with_uniform_score(8.0)
            .with_enrichment_outage();
        let pipeline = harness.pipeline();
        let job = job_with(2);
        harness.store.insert(job.clone()).await;

        let result = pipeline.run(&job).await.unwrap();

        assert_eq!(result.total_candidates, 2);
        for candidate in &result.candidates {
            assert_eq!(
                candidate.enriched.enrichment_status,
                EnrichmentStatus::Failed
            );
            assert!(candidate.overall_score > 0.0);
            assert!(candidate.scoring_error.is_none());
        }
        assert_eq!(result.stats.enrichment_failures, 2);
    }

    #[tokio::test]
    async fn test_cancel_flag_aborts_between_stages() {
        let harness = TestHarness::new().with_profiles(3).with_uniform_score(8.0);
        let pipeline = harness.pipeline();
        let job = job_with(3);
        harness.store.insert(job.clone()).await;
        // Claim it so the store carries the running + cancel-requested state.
        harness.store.mark_running(job.id).await.unwrap();
        harness.store.request_cancel(job.id).await.unwrap();

        let err = pipeline.run(&job).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled(_)));
        assert_eq!(harness.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_completed_result_lands_in_cache() {
        let harness = TestHarness::new().with_profiles(1).with_uniform_score(9.0);
        let pipeline = harness.pipeline();
        let job = job_with(1);
        harness.store.insert(job.clone()).await;

        pipeline.run(&job).await.unwrap();

        let fingerprint = request_fingerprint(&job.request);
        assert!(harness.cache.get_job_result(&fingerprint).await.is_some());
    }
}
