//! Evaluator capability — the LLM call that produces per-dimension
//! scores and outreach text. The stage (mod.rs) owns everything
//! numeric; this module only shapes prompts and parses responses.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write;

use crate::errors::CapabilityError;
use crate::llm_client::LlmClient;
use crate::models::candidate::{EnrichedCandidate, ScoreBreakdown};
use crate::scoring::prompts::{
    EVALUATION_PROMPT_TEMPLATE, EVALUATOR_SYSTEM, OUTREACH_PROMPT_TEMPLATE, OUTREACH_SYSTEM,
};

/// Opaque evaluation capability.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        candidate: &EnrichedCandidate,
        requirements: &str,
    ) -> Result<ScoreBreakdown, CapabilityError>;

    async fn generate_outreach(
        &self,
        candidate: &EnrichedCandidate,
        requirements: &str,
    ) -> Result<String, CapabilityError>;
}

/// LLM-backed implementation.
pub struct LlmEvaluator {
    llm: LlmClient,
}

impl LlmEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[derive(Debug, Deserialize)]
struct EvaluationResponse {
    dimension_scores: ScoreBreakdown,
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        candidate: &EnrichedCandidate,
        requirements: &str,
    ) -> Result<ScoreBreakdown, CapabilityError> {
        let prompt = EVALUATION_PROMPT_TEMPLATE
            .replace("{candidate_profile}", &format_profile(candidate))
            .replace("{job_requirements}", requirements);
        let response: EvaluationResponse = self.llm.call_json(&prompt, EVALUATOR_SYSTEM).await?;
        Ok(response.dimension_scores)
    }

    async fn generate_outreach(
        &self,
        candidate: &EnrichedCandidate,
        requirements: &str,
    ) -> Result<String, CapabilityError> {
        let prompt = OUTREACH_PROMPT_TEMPLATE
            .replace("{candidate_profile}", &format_profile(candidate))
            .replace("{job_requirements}", requirements);
        let response = self.llm.call(&prompt, OUTREACH_SYSTEM).await?;
        let text = response
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CapabilityError::Transient("empty outreach response".to_string()))?;
        Ok(text.to_string())
    }
}

/// Renders the candidate (extraction fields plus enrichment block) into
/// the plain-text profile the prompts embed. Writing to a String cannot
/// fail, so the `writeln!` results are discarded.
pub fn format_profile(enriched: &EnrichedCandidate) -> String {
    let c = &enriched.candidate;
    let mut out = String::new();
    let _ = writeln!(out, "- Name: {}", c.name);
    let _ = writeln!(out, "- Title: {}", c.headline.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "- Company: {}", c.company.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "- Location: {}", c.location.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "- Summary: {}", c.summary.as_deref().unwrap_or("N/A"));

    if !c.skills.is_empty() {
        let shown: Vec<&str> = c.skills.iter().take(10).map(String::as_str).collect();
        let _ = writeln!(out, "- Skills: {}", shown.join(", "));
    }

    if !c.education.is_empty() {
        let _ = writeln!(out, "\nEducation:");
        for entry in &c.education {
            let _ = writeln!(
                out,
                "  {} | {} | {}",
                entry.school,
                entry.degree.as_deref().unwrap_or("N/A"),
                entry.date_range.as_deref().unwrap_or("N/A"),
            );
        }
    }

    if !c.experience.is_empty() {
        let _ = writeln!(out, "\nExperience:");
        for entry in &c.experience {
            let _ = writeln!(
                out,
                "  {} at {} ({})",
                entry.title,
                entry.company,
                entry.date_range.as_deref().unwrap_or("N/A"),
            );
        }
    }

    if let Some(block) = &enriched.enrichment {
        let languages: Vec<&str> = block.top_languages.keys().map(String::as_str).collect();
        let _ = writeln!(
            out,
            "\nOpen-source activity: {} public repos, {} followers, languages: {}",
            block.public_repos,
            block.followers,
            if languages.is_empty() {
                "N/A".to_string()
            } else {
                languages.join(", ")
            }
        );
    }

    out
}
