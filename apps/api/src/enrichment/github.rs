//! Code-hosting enrichment provider.
//!
//! Resolves a candidate to a technical profile by name/company
//! heuristics against the provider's user search, then aggregates
//! repository activity (language usage, notable repositories) into the
//! summary the enrichment stage merges onto the candidate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::CapabilityError;
use crate::models::candidate::NotableRepo;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "sourcer-api";

/// A matched technical profile.
#[derive(Debug, Clone)]
pub struct TechProfile {
    pub username: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub public_repos: u64,
    pub followers: u64,
}

/// Aggregated repository activity for a matched profile.
#[derive(Debug, Clone, Default)]
pub struct ActivitySummary {
    /// Language → repository count, top entries only.
    pub languages: BTreeMap<String, u64>,
    pub notable_repos: Vec<NotableRepo>,
}

/// Opaque enrichment capability.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn find_profile(
        &self,
        name: &str,
        company: Option<&str>,
    ) -> Result<Option<TechProfile>, CapabilityError>;

    async fn get_activity(&self, username: &str) -> Result<ActivitySummary, CapabilityError>;
}

/// Username guesses tried against the user search, most specific first.
fn username_candidates(full_name: &str) -> Vec<String> {
    let cleaned: Vec<&str> = full_name
        .split_whitespace()
        .filter(|part| {
            !matches!(
                part.trim_end_matches('.').to_ascii_lowercase().as_str(),
                "mr" | "ms" | "mrs" | "dr" | "prof"
            )
        })
        .collect();

    let mut queries = Vec::new();
    if cleaned.len() >= 2 {
        let (first, last) = (cleaned[0], cleaned[cleaned.len() - 1]);
        queries.push(format!("{first} {last}"));
        queries.push(format!("{first}-{last}").to_lowercase());
        queries.push(format!("{first}{last}").to_lowercase());
    }
    if let Some(first) = cleaned.first() {
        queries.push(first.to_lowercase());
    }
    queries
}

/// Accepts a login only when it shares a meaningful name fragment with
/// the candidate — a weak-confidence hit counts as no match.
fn login_matches_name(login: &str, full_name: &str) -> bool {
    let login = login.to_lowercase();
    full_name
        .split_whitespace()
        .filter(|part| part.len() > 2)
        .any(|part| login.contains(&part.to_lowercase()))
}

/// HTTP client for the code-hosting API.
pub struct GithubEnrichment {
    client: reqwest::Client,
    token: Option<String>,
}

impl GithubEnrichment {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build HTTP client"),
            token,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, CapabilityError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::from_status(status, &body));
        }
        let value = response
            .json()
            .await
            .map_err(|e| CapabilityError::Permanent(format!("invalid provider schema: {e}")))?;
        Ok(Some(value))
    }
}

#[derive(Debug, Deserialize)]
struct UserSearchResponse {
    #[serde(default)]
    items: Vec<UserSearchItem>,
}

#[derive(Debug, Deserialize)]
struct UserSearchItem {
    login: String,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    login: String,
    name: Option<String>,
    company: Option<String>,
    bio: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    followers: u64,
}

#[derive(Debug, Deserialize)]
struct Repo {
    name: String,
    language: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    fork: bool,
}

#[async_trait]
impl EnrichmentProvider for GithubEnrichment {
    async fn find_profile(
        &self,
        name: &str,
        _company: Option<&str>,
    ) -> Result<Option<TechProfile>, CapabilityError> {
        for query in username_candidates(name) {
            let url = format!(
                "{API_BASE}/search/users?q={}&type=Users&per_page=5",
                urlencoding::encode(&query)
            );
            let Some(result) = self.get_json::<UserSearchResponse>(&url).await? else {
                continue;
            };
            for item in result.items {
                if !login_matches_name(&item.login, name) {
                    continue;
                }
                let profile_url = format!("{API_BASE}/users/{}", item.login);
                if let Some(profile) = self.get_json::<UserProfile>(&profile_url).await? {
                    debug!("matched technical profile {} for {name}", profile.login);
                    return Ok(Some(TechProfile {
                        username: profile.login,
                        name: profile.name,
                        company: profile.company,
                        bio: profile.bio,
                        public_repos: profile.public_repos,
                        followers: profile.followers,
                    }));
                }
            }
        }
        Ok(None)
    }

    async fn get_activity(&self, username: &str) -> Result<ActivitySummary, CapabilityError> {
        let url = format!("{API_BASE}/users/{username}/repos?per_page=100&sort=updated");
        let repos: Vec<Repo> = self.get_json(&url).await?.unwrap_or_default();
        Ok(summarize_repos(repos))
    }
}

fn summarize_repos(repos: Vec<Repo>) -> ActivitySummary {
    let mut languages: BTreeMap<String, u64> = BTreeMap::new();
    let mut owned: Vec<&Repo> = Vec::new();
    for repo in repos.iter().filter(|r| !r.fork) {
        if let Some(language) = &repo.language {
            *languages.entry(language.clone()).or_insert(0) += 1;
        }
        owned.push(repo);
    }

    // Keep the ten most-used languages.
    if languages.len() > 10 {
        let mut ranked: Vec<(String, u64)> = languages.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(10);
        languages = ranked.into_iter().collect();
    }

    owned.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    let notable_repos = owned
        .into_iter()
        .take(5)
        .map(|repo| NotableRepo {
            name: repo.name.clone(),
            stars: repo.stargazers_count,
            language: repo.language.clone(),
            description: repo.description.clone(),
        })
        .collect();

    ActivitySummary {
        languages,
        notable_repos,
    }
}
