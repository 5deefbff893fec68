//! HTTP routes for Warden
//!
//! Two separate surfaces on two listeners: the proxy API that agents call,
//! and the admin API consumed by the operator dashboard.

pub mod admin;
pub mod health;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{proxy, AppState};

/// Create the proxy API router (agent-facing).
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(proxy::chat_completions))
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the admin API router (operator-facing).
pub fn create_admin_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/providers", get(admin::list_providers))
        .route("/providers", post(admin::upsert_provider))
        .route("/providers/:name", delete(admin::delete_provider))
        .route("/costs", get(admin::all_costs))
        .route("/costs/:agent_id", get(admin::agent_costs))
        .route("/pod", get(admin::pod_info))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
