pub mod health;
pub mod jobs;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/jobs", post(jobs::handle_submit).get(jobs::handle_list))
        .route("/api/jobs/:id", get(jobs::handle_status))
        .route("/api/jobs/:id/results", get(jobs::handle_results))
        .route("/api/jobs/:id/cancel", post(jobs::handle_cancel))
        .route("/api/jobs/:id/cache", delete(jobs::handle_delete_cache))
        .with_state(state)
}
