// Shared prompt constants. Domain-specific prompts live alongside their
// module (scoring/prompts.rs); this file holds cross-cutting fragments
// and the keyword-extraction prompt used at pipeline start.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for search keyword extraction.
pub const KEYWORD_SYSTEM: &str = "You are a talent-search expert. \
    Extract the most effective search keywords from job descriptions. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Keyword extraction prompt template. Replace `{job_description}` before sending.
pub const KEYWORD_PROMPT_TEMPLATE: &str = r#"Analyze this job description and extract the best profile-search keywords.

Return a JSON object with this EXACT schema (no extra fields):
{
  "title": "primary job title to search for",
  "skills": ["top 3-5 technical skills mentioned"],
  "companies": ["notable companies mentioned or similar companies to target"],
  "location": "primary location if mentioned, else null"
}

Focus on terms that would appear in professional profiles.

JOB DESCRIPTION:
{job_description}"#;
