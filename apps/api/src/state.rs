use std::sync::Arc;

use crate::config::Config;
use crate::jobs::store::JobStore;
use crate::jobs::JobQueue;

/// Shared application state injected into all route handlers via Axum
/// extractors. The queue and store are the only entry points to job
/// records; cache access goes through the queue (fingerprints are its
/// concern, not the handlers').
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub store: Arc<JobStore>,
    pub config: Config,
}
