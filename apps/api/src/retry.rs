//! Shared retry policy for external capability calls.
//!
//! Every call site uses the same primitive so backoff behavior stays
//! consistent and testable in one place. Only transient errors are
//! retried; a permanent error aborts immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::CapabilityError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    /// Extraction and keyword-generation calls: base 1s, factor 2, 3 attempts.
    pub fn extraction() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }

    /// Crawl page fetches: retried up to 2 extra times before the page
    /// is skipped.
    pub fn page_fetch() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }

    /// Enrichment and evaluator calls retry exactly once with backoff.
    pub fn single_retry() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or the
    /// attempt budget is spent. The delay before attempt n (1-based
    /// retries) is `base_delay * multiplier^(n-1)`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, CapabilityError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CapabilityError>>,
    {
        let mut last_error: Option<CapabilityError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.base_delay * self.multiplier.pow(attempt - 1);
                warn!(
                    "{label}: attempt {attempt} failed, retrying after {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        // Unreachable in practice: the final attempt returns above.
        Err(last_error
            .unwrap_or_else(|| CapabilityError::Transient(format!("{label}: retries exhausted"))))
    }
}
