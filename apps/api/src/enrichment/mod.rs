//! Enrichment stage — best-effort merge of technical-profile activity
//! onto extracted candidates.
//!
//! Enrichment can downgrade (unmatched, failed) but never fail the
//! pipeline and never blocks downstream scoring. It only ever ADDS a
//! nested block; extraction-derived fields stay untouched.

pub mod github;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CachedEnrichment, ResultCache};
use crate::errors::CapabilityError;
use crate::gate::{Capability, ConcurrencyGate};
use crate::models::candidate::{
    Candidate, EnrichedCandidate, EnrichmentBlock, EnrichmentStatus,
};
use crate::retry::RetryPolicy;

use self::github::EnrichmentProvider;

pub struct EnrichmentStage {
    provider: Arc<dyn EnrichmentProvider>,
    gate: Arc<ConcurrencyGate>,
    cache: Arc<ResultCache>,
}

impl EnrichmentStage {
    pub fn new(
        provider: Arc<dyn EnrichmentProvider>,
        gate: Arc<ConcurrencyGate>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            provider,
            gate,
            cache,
        }
    }

    pub async fn enrich(&self, candidate: Candidate) -> EnrichedCandidate {
        let identity = candidate.identity();

        // Recently-seen candidates skip the external call entirely.
        if let Some(cached) = self.cache.get_candidate(&identity).await {
            debug!("enrichment cache hit for {identity}");
            return EnrichedCandidate {
                candidate,
                enrichment_status: cached.status,
                enrichment: cached.block,
            };
        }

        // A bare name gives the match heuristics nothing to work with.
        if candidate.name.trim().len() < 3 {
            return EnrichedCandidate::unenriched(candidate, EnrichmentStatus::Skipped);
        }

        let (status, block) = match self.resolve(&candidate).await {
            Ok(Some(block)) => (EnrichmentStatus::Matched, Some(block)),
            Ok(None) => (EnrichmentStatus::Unmatched, None),
            Err(e) => {
                warn!("enrichment failed for {}: {e}", candidate.name);
                (EnrichmentStatus::Failed, None)
            }
        };

        self.cache
            .put_candidate(
                identity,
                CachedEnrichment {
                    status,
                    block: block.clone(),
                },
            )
            .await;

        EnrichedCandidate {
            candidate,
            enrichment_status: status,
            enrichment: block,
        }
    }

    async fn resolve(
        &self,
        candidate: &Candidate,
    ) -> Result<Option<EnrichmentBlock>, CapabilityError> {
        let retry = RetryPolicy::single_retry();
        let _permit = self.gate.acquire(Capability::Enrich).await;

        let profile = retry
            .run("find_profile", || {
                self.provider
                    .find_profile(&candidate.name, candidate.company.as_deref())
            })
            .await?;

        let Some(profile) = profile else {
            return Ok(None);
        };

        // Activity is part of the same best-effort budget: a failure
        // here downgrades the whole candidate to Failed via `?`.
        let activity = retry
            .run("get_activity", || {
                self.provider.get_activity(&profile.username)
            })
            .await?;

        Ok(Some(EnrichmentBlock {
            profile_url: format!("https://github.com/{}", profile.username),
            username: profile.username,
            bio: profile.bio,
            public_repos: profile.public_repos,
            followers: profile.followers,
            top_languages: activity.languages,
            notable_repos: activity.notable_repos,
        }))
    }
}
