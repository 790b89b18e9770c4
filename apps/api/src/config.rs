use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Required variables fail startup with context; everything else defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub people_search_api_key: String,
    pub people_search_url: String,
    pub github_token: Option<String>,
    pub proxy_url: Option<String>,
    /// Site prefix used to scope crawl-variant queries, e.g. "linkedin.com/in".
    pub profile_site: String,
    pub output_dir: PathBuf,
    pub worker_count: usize,
    pub job_timeout: Duration,
    pub crawl_delay: Duration,
    pub result_cache_ttl: Duration,
    pub candidate_cache_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            people_search_api_key: require_env("PEOPLE_SEARCH_API_KEY")?,
            people_search_url: env_or(
                "PEOPLE_SEARCH_URL",
                "https://fresh-profile-data.p.rapidapi.com/google-full-profiles",
            ),
            github_token: std::env::var("GITHUB_TOKEN").ok(),
            proxy_url: std::env::var("PROXY_URL").ok(),
            profile_site: env_or("PROFILE_SITE", "linkedin.com/in"),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "./output")),
            worker_count: parse_env("WORKER_COUNT", 4)?,
            job_timeout: Duration::from_secs(parse_env("JOB_TIMEOUT_SECS", 600)?),
            crawl_delay: Duration::from_millis(parse_env("CRAWL_DELAY_MS", 2000)?),
            result_cache_ttl: Duration::from_secs(parse_env("RESULT_CACHE_TTL_SECS", 3600)?),
            candidate_cache_ttl: Duration::from_secs(parse_env(
                "CANDIDATE_CACHE_TTL_SECS",
                7 * 24 * 3600,
            )?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid value")),
        Err(_) => Ok(default),
    }
}
