//! In-process result cache with per-entry expiry.
//!
//! Two logical namespaces share one store object:
//! - job results, keyed by the request fingerprint (short TTL), backing
//!   the submit-time fast path;
//! - candidate enrichment, keyed by normalized profile identity (long
//!   TTL), letting recently-seen candidates skip the enrichment call.
//!
//! All access is atomic per key; nothing spans keys, so a plain
//! `RwLock<HashMap>` is sufficient. Expired entries are dropped lazily
//! on read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::candidate::{EnrichmentBlock, EnrichmentStatus};
use crate::models::job::{JobRequest, JobResult};

/// Deterministic fingerprint of a request's normalized parameters.
///
/// Normalization: lowercase the description, collapse runs of
/// whitespace, then hash together with the method tag and limit — so
/// formatting-only differences between two submissions still hit the
/// same cache entry.
pub fn request_fingerprint(request: &JobRequest) -> String {
    let normalized = request
        .job_description
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update(b":");
    hasher.update(request.search_method.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(request.limit.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cached outcome of one candidate's enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEnrichment {
    pub status: EnrichmentStatus,
    pub block: Option<EnrichmentBlock>,
}

struct Entry<T> {
    payload: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

pub struct ResultCache {
    job_results: RwLock<HashMap<String, Entry<JobResult>>>,
    candidates: RwLock<HashMap<String, Entry<CachedEnrichment>>>,
    job_ttl: Duration,
    candidate_ttl: Duration,
}

impl ResultCache {
    pub fn new(job_ttl: Duration, candidate_ttl: Duration) -> Self {
        Self {
            job_results: RwLock::new(HashMap::new()),
            candidates: RwLock::new(HashMap::new()),
            job_ttl,
            candidate_ttl,
        }
    }

    pub async fn get_job_result(&self, fingerprint: &str) -> Option<JobResult> {
        get_live(&self.job_results, fingerprint).await
    }

    pub async fn put_job_result(&self, fingerprint: String, result: JobResult) {
        let mut map = self.job_results.write().await;
        map.insert(
            fingerprint,
            Entry {
                payload: result,
                expires_at: Instant::now() + self.job_ttl,
            },
        );
    }

    /// Drops the job-result entry for a fingerprint. Returns whether an
    /// entry existed.
    pub async fn remove_job_result(&self, fingerprint: &str) -> bool {
        self.job_results.write().await.remove(fingerprint).is_some()
    }

    pub async fn get_candidate(&self, identity: &str) -> Option<CachedEnrichment> {
        get_live(&self.candidates, identity).await
    }

    pub async fn put_candidate(&self, identity: String, enrichment: CachedEnrichment) {
        let mut map = self.candidates.write().await;
        map.insert(
            identity,
            Entry {
                payload: enrichment,
                expires_at: Instant::now() + self.candidate_ttl,
            },
        );
    }
}

async fn get_live<T: Clone>(store: &RwLock<HashMap<String, Entry<T>>>, key: &str) -> Option<T> {
    {
        let map = store.read().await;
        match map.get(key) {
            Some(entry) if entry.live() => return Some(entry.payload.clone()),
            Some(_) => {}
            None => return None,
        }
    }
    // Expired: upgrade to a write lock and drop the stale entry.
    let mut map = store.write().await;
    if let Some(entry) = map.get(key) {
        if entry.live() {
            return Some(entry.payload.clone());
        }
        map.remove(key);
    }
    None
}
