mod cache;
mod config;
mod enrichment;
mod errors;
mod gate;
mod jobs;
mod llm_client;
mod models;
mod pipeline;
mod retry;
mod routes;
mod scoring;
mod search;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::ResultCache;
use crate::config::Config;
use crate::enrichment::github::{EnrichmentProvider, GithubEnrichment};
use crate::enrichment::EnrichmentStage;
use crate::gate::{ConcurrencyGate, GateConfig};
use crate::jobs::pool::spawn_workers;
use crate::jobs::store::JobStore;
use crate::jobs::JobQueue;
use crate::llm_client::LlmClient;
use crate::pipeline::persist::{ArtifactWriter, CANDIDATE_REFRESH_AFTER};
use crate::pipeline::Pipeline;
use crate::routes::build_router;
use crate::scoring::evaluator::{Evaluator, LlmEvaluator};
use crate::scoring::ScoringStage;
use crate::search::crawler::{PageFetcher, ProxyPageFetcher};
use crate::search::keywords::{KeywordGenerator, LlmKeywordGenerator};
use crate::search::structured::{HttpPeopleSearch, PeopleSearch};
use crate::search::ExtractionRouter;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sourcer API v{}", env!("CARGO_PKG_VERSION"));

    // Shared keyed stores — constructed once, passed everywhere.
    let store = Arc::new(JobStore::new());
    let cache = Arc::new(ResultCache::new(
        config.result_cache_ttl,
        config.candidate_cache_ttl,
    ));
    let gate = Arc::new(ConcurrencyGate::new(
        GateConfig::default().with_crawl_delay(config.crawl_delay),
    ));

    // External capabilities behind their trait seams.
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let keyword_generator: Arc<dyn KeywordGenerator> =
        Arc::new(LlmKeywordGenerator::new(llm.clone()));
    let people_search: Arc<dyn PeopleSearch> = Arc::new(HttpPeopleSearch::new(
        config.people_search_url.clone(),
        config.people_search_api_key.clone(),
    ));
    let fetcher: Arc<dyn PageFetcher> = Arc::new(ProxyPageFetcher::new(
        config.proxy_url.as_deref(),
    )?);
    let enrichment_provider: Arc<dyn EnrichmentProvider> =
        Arc::new(GithubEnrichment::new(config.github_token.clone()));
    let evaluator: Arc<dyn Evaluator> = Arc::new(LlmEvaluator::new(llm));

    // Pipeline wiring.
    let router = ExtractionRouter::new(
        people_search,
        fetcher,
        gate.clone(),
        config.profile_site.clone(),
    );
    let enrichment = Arc::new(EnrichmentStage::new(
        enrichment_provider,
        gate.clone(),
        cache.clone(),
    ));
    let scoring = Arc::new(ScoringStage::new(evaluator, gate.clone()));
    let artifacts = ArtifactWriter::new(config.output_dir.clone(), CANDIDATE_REFRESH_AFTER);
    let pipeline = Arc::new(Pipeline::new(
        keyword_generator,
        router,
        enrichment,
        scoring,
        cache.clone(),
        store.clone(),
        gate.clone(),
        artifacts,
    ));

    // Queue + worker pool.
    let (queue, receiver) = JobQueue::new(store.clone(), cache.clone());
    let workers = spawn_workers(
        config.worker_count,
        store.clone(),
        pipeline,
        receiver,
        config.job_timeout,
    );
    info!("Started {} workers", workers.len());

    // HTTP boundary.
    let state = AppState {
        queue: Arc::new(queue),
        store,
        config: config.clone(),
    };
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
