//! Candidate data model — the record that flows through the pipeline.
//!
//! A `Candidate` is produced by extraction, wrapped into an
//! `EnrichedCandidate` by the enrichment stage (which only ever ADDS a
//! nested block, never touches extraction-derived fields), and finally
//! into a `ScoredCandidate` by the scoring stage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::SearchMethod;

/// A single work experience entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub date_range: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

/// A single education entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationEntry {
    pub school: String,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub date_range: Option<String>,
}

/// A sourced profile before enrichment/scoring.
///
/// `profile_url` is the stable source identity — all dedup and caching
/// keys off the normalized form of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub profile_url: String,
    pub headline: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub extraction_method: SearchMethod,
    pub extracted_at: DateTime<Utc>,
}

impl Candidate {
    /// Normalized identity used for dedup, caching, and artifact filenames.
    pub fn identity(&self) -> String {
        normalize_profile_url(&self.profile_url)
    }
}

/// Strips tracking parameters, fragments and trailing slashes from a
/// profile URL so two extractions of the same profile compare equal.
pub fn normalize_profile_url(url: &str) -> String {
    let mut clean = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .to_string();
    if !clean.starts_with("https://") {
        if let Some(rest) = clean.strip_prefix("http://") {
            clean = format!("https://{rest}");
        }
    }
    clean
}

/// Filesystem-safe slug for artifact filenames.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Enrichment
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of the enrichment stage for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Matched,
    Unmatched,
    Skipped,
    Failed,
}

/// A notable repository surfaced by the enrichment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotableRepo {
    pub name: String,
    pub stars: u64,
    pub language: Option<String>,
    pub description: Option<String>,
}

/// Technical-activity attributes merged in by enrichment.
/// Strictly additive: extraction fields are never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentBlock {
    pub username: String,
    pub profile_url: String,
    pub bio: Option<String>,
    pub public_repos: u64,
    pub followers: u64,
    /// Language → repo count, descending by usage when iterated via
    /// `top_languages` ordering helpers (BTreeMap keeps output stable).
    pub top_languages: BTreeMap<String, u64>,
    pub notable_repos: Vec<NotableRepo>,
}

/// Candidate plus the optional enrichment block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub enrichment_status: EnrichmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentBlock>,
}

impl EnrichedCandidate {
    pub fn unenriched(candidate: Candidate, status: EnrichmentStatus) -> Self {
        Self {
            candidate,
            enrichment_status: status,
            enrichment: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Per-dimension scores (0–10) returned by the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub education: f64,
    pub trajectory: f64,
    pub company: f64,
    pub skills: f64,
    pub location: f64,
    pub tenure: f64,
}

impl ScoreBreakdown {
    /// Clamps every dimension into the 0–10 range the rubric defines.
    /// Evaluator output is not trusted to stay in bounds.
    pub fn clamped(&self) -> Self {
        let clamp = |v: f64| v.clamp(0.0, 10.0);
        Self {
            education: clamp(self.education),
            trajectory: clamp(self.trajectory),
            company: clamp(self.company),
            skills: clamp(self.skills),
            location: clamp(self.location),
            tenure: clamp(self.tenure),
        }
    }
}

/// Recommendation tier derived from the overall score.
/// Thresholds are monotonic: a higher score never yields a lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "STRONG_MATCH")]
    StrongMatch,
    #[serde(rename = "MATCH")]
    Match,
    #[serde(rename = "WEAK_MATCH")]
    WeakMatch,
    #[serde(rename = "NO_MATCH")]
    NoMatch,
}

/// Candidates at `Match` or better count as passed.
pub const PASS_THRESHOLD: f64 = 7.5;

impl Recommendation {
    pub fn from_score(overall: f64) -> Self {
        if overall >= 9.0 {
            Recommendation::StrongMatch
        } else if overall >= PASS_THRESHOLD {
            Recommendation::Match
        } else if overall >= 6.0 {
            Recommendation::WeakMatch
        } else {
            Recommendation::NoMatch
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Recommendation::StrongMatch | Recommendation::Match)
    }
}

/// Fully processed candidate as it appears in a `JobResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub enriched: EnrichedCandidate,
    pub dimension_scores: ScoreBreakdown,
    /// Weighted average, two-decimal precision, computed by the core.
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outreach_message: Option<String>,
    /// Set when the evaluator failed after its retry and the candidate
    /// carries a zero score instead of sinking the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_query_fragment_and_slash() {
        let url = "https://www.linkedin.com/in/jane-doe/?trk=search#about";
        assert_eq!(
            normalize_profile_url(url),
            "https://www.linkedin.com/in/jane-doe"
        );
    }

    #[test]
    fn test_normalize_upgrades_scheme() {
        assert_eq!(
            normalize_profile_url("http://www.linkedin.com/in/jane-doe"),
            "https://www.linkedin.com/in/jane-doe"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_profile_url("https://example.com/in/a-b/");
        assert_eq!(normalize_profile_url(&once), once);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Jane Q. Doe"), "jane-q-doe");
        assert_eq!(slugify("--weird__input!!"), "weird-input");
    }

    #[test]
    fn test_clamped_bounds_scores() {
        let breakdown = ScoreBreakdown {
            education: 12.0,
            trajectory: -3.0,
            company: 8.0,
            skills: 10.0,
            location: 0.0,
            tenure: 10.1,
        };
        let clamped = breakdown.clamped();
        assert_eq!(clamped.education, 10.0);
        assert_eq!(clamped.trajectory, 0.0);
        assert_eq!(clamped.company, 8.0);
        assert_eq!(clamped.tenure, 10.0);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(Recommendation::from_score(9.0), Recommendation::StrongMatch);
        assert_eq!(Recommendation::from_score(8.99), Recommendation::Match);
        assert_eq!(Recommendation::from_score(7.5), Recommendation::Match);
        assert_eq!(Recommendation::from_score(7.49), Recommendation::WeakMatch);
        assert_eq!(Recommendation::from_score(6.0), Recommendation::WeakMatch);
        assert_eq!(Recommendation::from_score(5.99), Recommendation::NoMatch);
        assert_eq!(Recommendation::from_score(0.0), Recommendation::NoMatch);
    }

    #[test]
    fn test_recommendation_is_monotonic() {
        let tier_rank = |r: Recommendation| match r {
            Recommendation::NoMatch => 0,
            Recommendation::WeakMatch => 1,
            Recommendation::Match => 2,
            Recommendation::StrongMatch => 3,
        };
        let mut prev = 0;
        for step in 0..=100 {
            let score = step as f64 / 10.0;
            let rank = tier_rank(Recommendation::from_score(score));
            assert!(rank >= prev, "tier dropped at score {score}");
            prev = rank;
        }
    }

    #[test]
    fn test_pass_boundary_aligns_with_match_tier() {
        assert!(Recommendation::from_score(PASS_THRESHOLD).passed());
        assert!(!Recommendation::from_score(PASS_THRESHOLD - 0.01).passed());
    }

    #[test]
    fn test_recommendation_serializes_screaming_case() {
        let json = serde_json::to_string(&Recommendation::StrongMatch).unwrap();
        assert_eq!(json, "\"STRONG_MATCH\"");
        let back: Recommendation = serde_json::from_str("\"NO_MATCH\"").unwrap();
        assert_eq!(back, Recommendation::NoMatch);
    }
}
