//! Extraction — turns generated keywords into raw candidate records via
//! one of two interchangeable variants, selected once per job.

pub mod crawler;
pub mod keywords;
pub mod structured;

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::gate::ConcurrencyGate;
use crate::models::candidate::Candidate;
use crate::models::job::SearchMethod;
use crate::search::crawler::PageFetcher;
use crate::search::keywords::SearchKeywords;
use crate::search::structured::PeopleSearch;

/// Counters kept while a variant runs; folded into the job's
/// `ProcessingStats` at assembly.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExtractionStats {
    /// Records dropped for missing a name or profile identity.
    pub malformed_dropped: usize,
    /// Provider calls or pages abandoned after exhausting their retries.
    pub provider_errors: usize,
}

/// Dispatches a job's extraction to exactly one variant.
pub struct ExtractionRouter {
    people_search: Arc<dyn PeopleSearch>,
    fetcher: Arc<dyn PageFetcher>,
    gate: Arc<ConcurrencyGate>,
    profile_site: String,
}

impl ExtractionRouter {
    pub fn new(
        people_search: Arc<dyn PeopleSearch>,
        fetcher: Arc<dyn PageFetcher>,
        gate: Arc<ConcurrencyGate>,
        profile_site: String,
    ) -> Self {
        Self {
            people_search,
            fetcher,
            gate,
            profile_site,
        }
    }

    pub fn profile_site(&self) -> &str {
        &self.profile_site
    }

    /// Runs the chosen variant to completion. Never errors: provider
    /// failures degrade to partial (possibly empty) results, and the
    /// coordinator decides whether an empty batch is fatal.
    pub async fn extract(
        &self,
        keywords: &SearchKeywords,
        method: SearchMethod,
        limit: usize,
    ) -> (Vec<Candidate>, ExtractionStats) {
        let mut stats = ExtractionStats::default();
        let candidates = match method {
            SearchMethod::StructuredApi => {
                structured::collect(
                    self.people_search.as_ref(),
                    &self.gate,
                    keywords,
                    limit,
                    &mut stats,
                )
                .await
            }
            SearchMethod::Crawler => {
                crawler::collect(
                    self.fetcher.as_ref(),
                    &self.gate,
                    keywords,
                    &self.profile_site,
                    limit,
                    &mut stats,
                )
                .await
            }
        };
        info!(
            "extraction via {} found {} candidates ({} malformed dropped)",
            method.as_str(),
            candidates.len(),
            stats.malformed_dropped
        );
        (candidates, stats)
    }
}
