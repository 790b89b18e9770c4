//! Crawl extraction variant.
//!
//! Builds a directory search query from the generated keywords, fetches
//! result pages through the proxy-routed page fetcher behind the crawl
//! gate (which also enforces the fixed inter-request delay), and parses
//! each page's profile anchors and snippets into candidate stubs. An
//! individual page is retried up to 2 extra times on transient failure
//! and then skipped — the batch succeeds with fewer results rather than
//! failing outright.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::errors::CapabilityError;
use crate::gate::{Capability, ConcurrencyGate};
use crate::models::candidate::{normalize_profile_url, Candidate};
use crate::models::job::SearchMethod;
use crate::retry::RetryPolicy;
use crate::search::keywords::SearchKeywords;
use crate::search::ExtractionStats;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const RESULTS_PER_PAGE: usize = 10;
/// Hard cap on result pages per job, independent of limit.
const MAX_RESULT_PAGES: usize = 10;

/// Opaque page-fetch capability: proxy routing and anti-blocking live
/// behind this seam, not in the core.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, CapabilityError>;
}

/// `reqwest`-backed fetcher with an optional upstream proxy.
pub struct ProxyPageFetcher {
    client: reqwest::Client,
}

impl ProxyPageFetcher {
    pub fn new(proxy_url: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT);
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for ProxyPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CapabilityError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::from_status(status, ""));
        }
        Ok(response.text().await?)
    }
}

/// Search-result URL for one page of the directory query.
pub fn result_page_url(query: &str, start: usize) -> String {
    format!(
        "https://www.google.com/search?q={}&num={RESULTS_PER_PAGE}&start={start}&hl=en&gl=us",
        urlencoding::encode(query)
    )
}

/// Unwraps redirect-style hrefs (`/url?q=<target>&...`) down to the
/// target profile URL; passes direct links through.
fn clean_result_href(href: &str) -> Option<String> {
    let target = if let Some(rest) = href.strip_prefix("/url?") {
        rest.split('&')
            .find_map(|pair| pair.strip_prefix("q="))
            .map(|q| urlencoding::decode(q).map(|s| s.into_owned()).ok())??
    } else {
        href.to_string()
    };
    target.starts_with("http").then_some(target)
}

/// Splits a result headline like `Jane Doe - Staff Engineer - Acme | …`
/// into (name, headline, company).
fn parse_headline(text: &str) -> (String, Option<String>, Option<String>) {
    let text = text
        .rsplit_once('|')
        .map(|(left, _)| left)
        .unwrap_or(text)
        .trim();
    let mut parts = text.split(" - ").map(str::trim);
    let name = parts.next().unwrap_or_default().to_string();
    let headline = parts.next().filter(|p| !p.is_empty()).map(String::from);
    let company = parts.next().filter(|p| !p.is_empty()).map(String::from);
    (name, headline, company)
}

/// Parses one search-result page into candidate stubs. Anchors that do
/// not point at the profile site, or yield no name, are skipped (the
/// nameless ones counted as malformed).
pub fn parse_result_page(
    html: &str,
    profile_site: &str,
    stats: &mut ExtractionStats,
) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]").expect("static selector");
    let title_selector = Selector::parse("h3").expect("static selector");

    let mut candidates = Vec::new();
    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(profile_site) {
            continue;
        }
        let Some(url) = clean_result_href(href) else {
            continue;
        };

        let Some(title_el) = anchor.select(&title_selector).next() else {
            continue;
        };
        let heading = title_el.text().collect::<String>();
        let (name, headline, company) = parse_headline(&heading);
        if name.is_empty() {
            stats.malformed_dropped += 1;
            continue;
        }

        candidates.push(Candidate {
            name,
            profile_url: normalize_profile_url(&url),
            headline,
            company,
            location: None,
            summary: None,
            experience: vec![],
            education: vec![],
            skills: vec![],
            extraction_method: SearchMethod::Crawler,
            extracted_at: Utc::now(),
        });
    }
    candidates
}

/// Gathers up to `limit` unique candidates by paging through directory
/// search results.
pub async fn collect(
    fetcher: &dyn PageFetcher,
    gate: &ConcurrencyGate,
    keywords: &SearchKeywords,
    profile_site: &str,
    limit: usize,
    stats: &mut ExtractionStats,
) -> Vec<Candidate> {
    let retry = RetryPolicy::page_fetch();
    let query = keywords.search_query(profile_site);
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for page in 0..MAX_RESULT_PAGES {
        if candidates.len() >= limit {
            break;
        }
        let url = result_page_url(&query, page * RESULTS_PER_PAGE);

        let html = {
            let _permit = gate.acquire(Capability::Crawl).await;
            retry.run("page_fetch", || fetcher.fetch(&url)).await
        };

        let html = match html {
            Ok(html) => html,
            Err(e) => {
                // Partial-result tolerance: skip this page, keep going.
                warn!("result page {page} skipped after retries: {e}");
                stats.provider_errors += 1;
                continue;
            }
        };

        let mut fresh = 0;
        for candidate in parse_result_page(&html, profile_site, stats) {
            if candidates.len() >= limit {
                break;
            }
            if seen.insert(candidate.identity()) {
                candidates.push(candidate);
                fresh += 1;
            }
        }

        if fresh == 0 {
            debug!("result page {page} yielded nothing new, stopping");
            break;
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PAGE: &str = r#"
        <html><body>
          <a href="/url?q=https://www.linkedin.com/in/jane-doe/%3Ftrk%3Dx&amp;sa=U">
            <h3>Jane Doe - Staff Engineer - Acme | ProfileSite</h3>
          </a>
          <a href="https://www.linkedin.com/in/bob-smith">
            <h3>Bob Smith - Backend Developer</h3>
          </a>
          <a href="https://news.example.com/article"><h3>Unrelated hit</h3></a>
          <a href="https://www.linkedin.com/in/no-heading"></a>
        </body></html>
    "#;

    #[test]
    fn test_parse_result_page_extracts_profiles() {
        let mut stats = ExtractionStats::default();
        let candidates = parse_result_page(PAGE, "linkedin.com/in", &mut stats);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Jane Doe");
        assert_eq!(candidates[0].headline.as_deref(), Some("Staff Engineer"));
        assert_eq!(candidates[0].company.as_deref(), Some("Acme"));
        assert_eq!(
            candidates[0].profile_url,
            "https://www.linkedin.com/in/jane-doe"
        );
        assert_eq!(candidates[1].name, "Bob Smith");
        assert!(candidates[1].company.is_none());
    }

    #[test]
    fn test_clean_result_href_unwraps_redirects() {
        assert_eq!(
            clean_result_href("/url?q=https%3A%2F%2Fx.com%2Fin%2Fa&sa=U").as_deref(),
            Some("https://x.com/in/a")
        );
        assert_eq!(
            clean_result_href("https://x.com/in/b").as_deref(),
            Some("https://x.com/in/b")
        );
        assert!(clean_result_href("/relative/path").is_none());
    }

    #[test]
    fn test_parse_headline_variants() {
        let (name, headline, company) = parse_headline("Jane Doe - Engineer - Acme | Site");
        assert_eq!(name, "Jane Doe");
        assert_eq!(headline.as_deref(), Some("Engineer"));
        assert_eq!(company.as_deref(), Some("Acme"));

        let (name, headline, company) = parse_headline("Solo Name");
        assert_eq!(name, "Solo Name");
        assert!(headline.is_none());
        assert!(company.is_none());
    }

    struct PagedFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for PagedFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, CapabilityError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(PAGE.to_string()),
                _ => Ok("<html><body>no more hits</body></html>".to_string()),
            }
        }
    }

    #[tokio::test]
    async fn test_collect_stops_when_pages_dry_up() {
        let fetcher = PagedFetcher {
            calls: AtomicUsize::new(0),
        };
        let gate = ConcurrencyGate::new(GateConfig::default().with_crawl_delay(Duration::ZERO));
        let mut stats = ExtractionStats::default();
        let keywords = SearchKeywords {
            title: "engineer".to_string(),
            ..SearchKeywords::default()
        };

        let candidates = collect(
            &fetcher,
            &gate,
            &keywords,
            "linkedin.com/in",
            5,
            &mut stats,
        )
        .await;

        assert_eq!(candidates.len(), 2);
        // First page plus the empty follow-up, then stop.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    struct FlakyFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for FlakyFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, CapabilityError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(CapabilityError::Transient("timeout".to_string())),
                2 => Ok(PAGE.to_string()),
                _ => Ok(String::new()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_failures_are_retried_then_tolerated() {
        let fetcher = FlakyFetcher {
            calls: AtomicUsize::new(0),
        };
        let gate = ConcurrencyGate::new(GateConfig::default().with_crawl_delay(Duration::ZERO));
        let mut stats = ExtractionStats::default();
        let keywords = SearchKeywords {
            title: "engineer".to_string(),
            ..SearchKeywords::default()
        };

        let candidates = collect(
            &fetcher,
            &gate,
            &keywords,
            "linkedin.com/in",
            5,
            &mut stats,
        )
        .await;

        // Two transient failures burned, third attempt served the page.
        assert_eq!(candidates.len(), 2);
        assert_eq!(stats.provider_errors, 0);
    }
}
