//! Shared mocked capabilities and a pipeline harness for unit tests.
//! Compiled only under `cfg(test)`.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::cache::ResultCache;
use crate::enrichment::github::{ActivitySummary, EnrichmentProvider, TechProfile};
use crate::enrichment::EnrichmentStage;
use crate::errors::CapabilityError;
use crate::gate::{ConcurrencyGate, GateConfig};
use crate::jobs::store::JobStore;
use crate::models::candidate::{
    Candidate, EnrichedCandidate, EnrichmentStatus, Recommendation, ScoreBreakdown,
    ScoredCandidate,
};
use crate::models::job::SearchMethod;
use crate::pipeline::persist::{ArtifactWriter, CANDIDATE_REFRESH_AFTER};
use crate::pipeline::Pipeline;
use crate::scoring::evaluator::Evaluator;
use crate::scoring::ScoringStage;
use crate::search::crawler::PageFetcher;
use crate::search::keywords::{KeywordGenerator, SearchKeywords};
use crate::search::structured::{PeopleSearch, RawProfile};
use crate::search::ExtractionRouter;

/// Builds a `ScoredCandidate` with the given score and consistent
/// derived fields.
pub fn scored_with(name: &str, overall: f64) -> ScoredCandidate {
    let recommendation = Recommendation::from_score(overall);
    ScoredCandidate {
        enriched: EnrichedCandidate::unenriched(
            Candidate {
                name: name.to_string(),
                profile_url: format!("https://example.com/in/{name}"),
                headline: None,
                company: None,
                location: None,
                summary: None,
                experience: vec![],
                education: vec![],
                skills: vec![],
                extraction_method: SearchMethod::StructuredApi,
                extracted_at: Utc::now(),
            },
            EnrichmentStatus::Unmatched,
        ),
        dimension_scores: ScoreBreakdown::default(),
        overall_score: overall,
        recommendation,
        passed: recommendation.passed(),
        outreach_message: None,
        scoring_error: None,
    }
}

pub struct StubKeywords {
    pub calls: AtomicUsize,
    pub outage: AtomicBool,
}

#[async_trait]
impl KeywordGenerator for StubKeywords {
    async fn generate(&self, _job_description: &str) -> Result<SearchKeywords, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.outage.load(Ordering::SeqCst) {
            return Err(CapabilityError::Permanent("auth failure".to_string()));
        }
        Ok(SearchKeywords {
            title: "backend engineer".to_string(),
            skills: vec!["Rust".to_string()],
            companies: vec![],
            location: Some("Berlin".to_string()),
        })
    }
}

/// Serves `profiles` synthetic records, honoring offset paging, and
/// counts every call for the cached-fast-path assertions.
pub struct CountingSearch {
    pub calls: AtomicUsize,
    pub profiles: AtomicUsize,
}

#[async_trait]
impl PeopleSearch for CountingSearch {
    async fn search(
        &self,
        _keywords: &SearchKeywords,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawProfile>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let total = self.profiles.load(Ordering::SeqCst);
        let end = (offset + limit).min(total);
        Ok((offset..end)
            .map(|i| RawProfile {
                name: format!("Candidate {i}"),
                profile_url: format!("https://example.com/in/candidate-{i}"),
                headline: Some("Engineer".to_string()),
                ..RawProfile::default()
            })
            .collect())
    }
}

pub struct StubFetcher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("<html><body></body></html>".to_string())
    }
}

pub struct StubEnrichmentProvider {
    pub calls: AtomicUsize,
    pub outage: AtomicBool,
}

#[async_trait]
impl EnrichmentProvider for StubEnrichmentProvider {
    async fn find_profile(
        &self,
        _name: &str,
        _company: Option<&str>,
    ) -> Result<Option<TechProfile>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.outage.load(Ordering::SeqCst) {
            return Err(CapabilityError::Permanent("bad token".to_string()));
        }
        Ok(None)
    }

    async fn get_activity(&self, _username: &str) -> Result<ActivitySummary, CapabilityError> {
        Ok(ActivitySummary::default())
    }
}

/// Returns a uniform breakdown; the score is stored as f64 bits so the
/// harness builders stay `&self`-free.
pub struct StubEvaluator {
    pub calls: AtomicUsize,
    pub score_bits: AtomicU64,
}

impl StubEvaluator {
    fn score(&self) -> f64 {
        f64::from_bits(self.score_bits.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Evaluator for StubEvaluator {
    async fn evaluate(
        &self,
        _candidate: &EnrichedCandidate,
        _requirements: &str,
    ) -> Result<ScoreBreakdown, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let s = self.score();
        Ok(ScoreBreakdown {
            education: s,
            trajectory: s,
            company: s,
            skills: s,
            location: s,
            tenure: s,
        })
    }

    async fn generate_outreach(
        &self,
        candidate: &EnrichedCandidate,
        _requirements: &str,
    ) -> Result<String, CapabilityError> {
        Ok(format!("Hi {}!", candidate.candidate.name))
    }
}

/// Everything a pipeline test needs, wired to mocks with counters.
pub struct TestHarness {
    pub store: Arc<JobStore>,
    pub cache: Arc<ResultCache>,
    pub gate: Arc<ConcurrencyGate>,
    pub keywords: Arc<StubKeywords>,
    pub search: Arc<CountingSearch>,
    pub fetcher: Arc<StubFetcher>,
    pub enrichment_provider: Arc<StubEnrichmentProvider>,
    pub evaluator: Arc<StubEvaluator>,
    artifacts_dir: tempfile::TempDir,
}

impl TestHarness {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            cache: Arc::new(ResultCache::new(
                Duration::from_secs(3600),
                Duration::from_secs(3600),
            )),
            gate: Arc::new(ConcurrencyGate::new(
                GateConfig::default().with_crawl_delay(Duration::ZERO),
            )),
            keywords: Arc::new(StubKeywords {
                calls: AtomicUsize::new(0),
                outage: AtomicBool::new(false),
            }),
            search: Arc::new(CountingSearch {
                calls: AtomicUsize::new(0),
                profiles: AtomicUsize::new(0),
            }),
            fetcher: Arc::new(StubFetcher {
                calls: AtomicUsize::new(0),
            }),
            enrichment_provider: Arc::new(StubEnrichmentProvider {
                calls: AtomicUsize::new(0),
                outage: AtomicBool::new(false),
            }),
            evaluator: Arc::new(StubEvaluator {
                calls: AtomicUsize::new(0),
                score_bits: AtomicU64::new(8.0f64.to_bits()),
            }),
            artifacts_dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn with_profiles(self, count: usize) -> Self {
        self.search.profiles.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_uniform_score(self, score: f64) -> Self {
        self.evaluator
            .score_bits
            .store(score.to_bits(), Ordering::SeqCst);
        self
    }

    pub fn with_keyword_outage(self) -> Self {
        self.keywords.outage.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_enrichment_outage(self) -> Self {
        self.enrichment_provider.outage.store(true, Ordering::SeqCst);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search.calls.load(Ordering::SeqCst)
    }

    pub fn pipeline(&self) -> Arc<Pipeline> {
        let router = ExtractionRouter::new(
            self.search.clone(),
            self.fetcher.clone(),
            self.gate.clone(),
            "example.com/in".to_string(),
        );
        let enrichment = Arc::new(EnrichmentStage::new(
            self.enrichment_provider.clone(),
            self.gate.clone(),
            self.cache.clone(),
        ));
        let scoring = Arc::new(ScoringStage::new(self.evaluator.clone(), self.gate.clone()));
        Arc::new(Pipeline::new(
            self.keywords.clone(),
            router,
            enrichment,
            scoring,
            self.cache.clone(),
            self.store.clone(),
            self.gate.clone(),
            ArtifactWriter::new(
                self.artifacts_dir.path().to_path_buf(),
                CANDIDATE_REFRESH_AFTER,
            ),
        ))
    }
}
