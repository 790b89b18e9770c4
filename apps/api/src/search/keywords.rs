//! Keyword generation — turns a raw job description into targeted
//! search terms via the LLM, consumed by both extraction variants.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CapabilityError;
use crate::llm_client::prompts::{KEYWORD_PROMPT_TEMPLATE, KEYWORD_SYSTEM};
use crate::llm_client::LlmClient;

/// Structured search terms extracted from a job description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchKeywords {
    pub title: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl SearchKeywords {
    /// Builds the crawl-variant query string:
    /// `site:<profile-site> "title" "location" "skill" "skill"`.
    pub fn search_query(&self, profile_site: &str) -> String {
        let mut parts = vec![format!("site:{profile_site}")];
        if !self.title.is_empty() {
            parts.push(format!("\"{}\"", self.title));
        }
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            parts.push(format!("\"{location}\""));
        }
        for skill in self.skills.iter().filter(|s| s.trim().len() > 2).take(2) {
            parts.push(format!("\"{}\"", skill.trim()));
        }
        parts.join(" ")
    }
}

/// Opaque keyword-generation capability. One call per job; the caller
/// wraps it with the extraction retry policy and the `keywords` gate.
#[async_trait]
pub trait KeywordGenerator: Send + Sync {
    async fn generate(&self, job_description: &str) -> Result<SearchKeywords, CapabilityError>;
}

/// LLM-backed implementation.
pub struct LlmKeywordGenerator {
    llm: LlmClient,
}

impl LlmKeywordGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl KeywordGenerator for LlmKeywordGenerator {
    async fn generate(&self, job_description: &str) -> Result<SearchKeywords, CapabilityError> {
        let prompt = KEYWORD_PROMPT_TEMPLATE.replace("{job_description}", job_description);
        let keywords: SearchKeywords = self.llm.call_json(&prompt, KEYWORD_SYSTEM).await?;
        if keywords.title.trim().is_empty() {
            return Err(CapabilityError::Transient(
                "keyword generation returned an empty title".to_string(),
            ));
        }
        Ok(keywords)
    }
}
