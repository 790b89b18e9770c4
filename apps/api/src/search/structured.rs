//! Structured-API extraction variant.
//!
//! Pages of provider results are pulled through the `search` gate with
//! the shared extraction retry policy, parsed by a strict serde schema
//! at the boundary (unknown provider fields are ignored), and mapped
//! into `Candidate` records until `limit` unique identities are
//! gathered or the provider is exhausted.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::CapabilityError;
use crate::gate::{Capability, ConcurrencyGate};
use crate::models::candidate::{normalize_profile_url, Candidate, EducationEntry, ExperienceEntry};
use crate::models::job::SearchMethod;
use crate::retry::RetryPolicy;
use crate::search::keywords::SearchKeywords;
use crate::search::ExtractionStats;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExperience {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub date_range: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEducation {
    #[serde(default)]
    pub school: String,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub date_range: Option<String>,
}

/// Provider-shaped profile record. Only the fields the pipeline maps
/// are declared; everything else the provider sends is dropped here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    #[serde(default, alias = "full_name")]
    pub name: String,
    pub headline: Option<String>,
    #[serde(default, alias = "linkedin_url")]
    pub profile_url: String,
    pub location: Option<String>,
    #[serde(alias = "about")]
    pub summary: Option<String>,
    pub current_company: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, alias = "experiences")]
    pub experience: Vec<RawExperience>,
    #[serde(default, alias = "educations")]
    pub education: Vec<RawEducation>,
}

/// Opaque people-search capability. `offset` pages through provider
/// results; an empty page means the provider is exhausted.
#[async_trait]
pub trait PeopleSearch: Send + Sync {
    async fn search(
        &self,
        keywords: &SearchKeywords,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawProfile>, CapabilityError>;
}

/// HTTP client for the structured people-search provider.
pub struct HttpPeopleSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPeopleSearch {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl PeopleSearch for HttpPeopleSearch {
    async fn search(
        &self,
        keywords: &SearchKeywords,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawProfile>, CapabilityError> {
        let payload = json!({
            "job_title": keywords.title,
            "location": keywords.location.clone().unwrap_or_default(),
            "skills": keywords.skills,
            "limit": limit,
            "offset": offset,
        });

        let response = self
            .client
            .post(&self.base_url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::from_status(status, &body));
        }

        #[derive(Deserialize)]
        struct SearchEnvelope {
            #[serde(default)]
            data: Vec<RawProfile>,
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| CapabilityError::Permanent(format!("invalid provider schema: {e}")))?;
        Ok(envelope.data)
    }
}

/// Maps one provider record into a `Candidate`. Returns `None` for
/// records missing a name or profile identity — those are dropped and
/// counted, never surfaced.
pub fn map_profile(raw: RawProfile, method: SearchMethod) -> Option<Candidate> {
    if raw.name.trim().is_empty() || raw.profile_url.trim().is_empty() {
        return None;
    }
    Some(Candidate {
        name: raw.name.trim().to_string(),
        profile_url: normalize_profile_url(&raw.profile_url),
        headline: raw.headline,
        company: raw.current_company,
        location: raw.location,
        summary: raw.summary,
        experience: raw
            .experience
            .into_iter()
            .filter(|e| !e.title.is_empty() || !e.company.is_empty())
            .map(|e| ExperienceEntry {
                title: e.title,
                company: e.company,
                date_range: e.date_range,
                duration: e.duration,
                description: e.description,
            })
            .collect(),
        education: raw
            .education
            .into_iter()
            .filter(|e| !e.school.is_empty())
            .map(|e| EducationEntry {
                school: e.school,
                degree: e.degree,
                field_of_study: e.field_of_study,
                date_range: e.date_range,
            })
            .collect(),
        skills: raw.skills,
        extraction_method: method,
        extracted_at: Utc::now(),
    })
}

/// Maximum follow-up pages after the first when the provider keeps
/// returning duplicates or malformed records.
const MAX_FOLLOW_UP_PAGES: usize = 3;

/// Gathers up to `limit` unique candidates from the structured provider.
/// Provider errors abort the affected call only; the batch tolerates
/// partial results and simply returns what it has.
pub async fn collect(
    provider: &dyn PeopleSearch,
    gate: &ConcurrencyGate,
    keywords: &SearchKeywords,
    limit: usize,
    stats: &mut ExtractionStats,
) -> Vec<Candidate> {
    let retry = RetryPolicy::extraction();
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut offset = 0;

    for page in 0..=MAX_FOLLOW_UP_PAGES {
        if candidates.len() >= limit {
            break;
        }

        let batch = {
            let _permit = gate.acquire(Capability::Search).await;
            retry
                .run("people_search", || provider.search(keywords, limit, offset))
                .await
        };

        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                warn!("people search page {page} aborted: {e}");
                stats.provider_errors += 1;
                break;
            }
        };

        if batch.is_empty() {
            debug!("people search exhausted after {offset} records");
            break;
        }

        offset += batch.len();
        for raw in batch {
            if candidates.len() >= limit {
                break;
            }
            match map_profile(raw, SearchMethod::StructuredApi) {
                Some(candidate) if seen.insert(candidate.identity()) => {
                    candidates.push(candidate);
                }
                Some(_) => {} // duplicate identity
                None => stats.malformed_dropped += 1,
            }
        }
    }

    candidates
}
