//! Admin API
//!
//! JSON surface over the registry and accumulator for the operator
//! dashboard: provider CRUD (persisted to providers.json on every
//! mutation), cost reports, and pod state. API keys are always masked on
//! the way out.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    context,
    cost::CostEntry,
    error::ErrorResponse,
    provider::{normalize_name, Provider, ProviderConfig},
    AppState,
};

/// Provider as rendered to operators; the key never leaves masked form.
#[derive(Debug, Serialize)]
pub struct ProviderView {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub auth: String,
    pub api_format: String,
}

impl ProviderView {
    fn from_provider(p: &Provider) -> Self {
        Self {
            name: p.name.clone(),
            base_url: p.base_url.clone(),
            api_key: mask_key(&p.api_key),
            auth: p.auth.clone(),
            api_format: p.api_format.clone(),
        }
    }
}

/// `GET /providers`
pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let providers: Vec<ProviderView> = state
        .registry
        .all()
        .values()
        .map(ProviderView::from_provider)
        .collect();
    Json(serde_json::json!({ "providers": providers }))
}

/// Upsert request body; unset fields fall back to well-known defaults.
#[derive(Debug, Deserialize)]
pub struct UpsertProviderRequest {
    pub name: String,
    #[serde(flatten)]
    pub config: ProviderConfig,
}

/// `POST /providers`
pub async fn upsert_provider(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertProviderRequest>,
) -> Response {
    let name = normalize_name(&req.name);
    if name.is_empty() {
        return admin_error(StatusCode::BAD_REQUEST, "provider name required");
    }

    // Build the response view from the submitted config rather than reading
    // the registry back; a concurrent delete must not turn into a panic.
    let provider = Provider::from_config(&name, req.config);
    state.registry.set(&name, provider.to_config());
    if let Err(e) = state.registry.save_to_file() {
        error!(error = %e, "Failed to persist providers.json");
        return admin_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to save providers");
    }

    info!(provider = %name, "Provider updated");
    (
        StatusCode::OK,
        Json(serde_json::json!({ "provider": ProviderView::from_provider(&provider) })),
    )
        .into_response()
}

/// `DELETE /providers/:name`
pub async fn delete_provider(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    if !state.registry.delete(&name) {
        return admin_error(StatusCode::NOT_FOUND, "unknown provider");
    }
    if let Err(e) = state.registry.save_to_file() {
        error!(error = %e, "Failed to persist providers.json");
        return admin_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to save providers");
    }

    info!(provider = %name, "Provider deleted");
    (StatusCode::OK, Json(serde_json::json!({ "deleted": name }))).into_response()
}

/// Cost report for all agents.
#[derive(Debug, Serialize)]
pub struct CostsResponse {
    pub agents: std::collections::BTreeMap<String, Vec<CostEntry>>,
    pub total_cost_usd: f64,
}

/// `GET /costs`
pub async fn all_costs(State(state): State<Arc<AppState>>) -> Json<CostsResponse> {
    // BTreeMap gives a stable agent ordering for presentation.
    let agents = state.accumulator.all().into_iter().collect();
    Json(CostsResponse {
        agents,
        total_cost_usd: state.accumulator.total_cost(),
    })
}

/// Cost report for one agent.
#[derive(Debug, Serialize)]
pub struct AgentCostsResponse {
    pub agent_id: String,
    pub entries: Vec<CostEntry>,
    pub total_cost_usd: f64,
}

/// `GET /costs/:agent_id`
pub async fn agent_costs(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Json<AgentCostsResponse> {
    let entries = state.accumulator.by_agent(&agent_id);
    let total_cost_usd = entries.iter().map(|e| e.total_cost_usd).sum();
    Json(AgentCostsResponse {
        agent_id,
        entries,
        total_cost_usd,
    })
}

/// Pod state for the dashboard landing view.
#[derive(Debug, Serialize)]
pub struct PodResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
    pub context_root: String,
    pub agents: Vec<String>,
    pub providers: Vec<String>,
}

/// `GET /pod`
pub async fn pod_info(State(state): State<Arc<AppState>>) -> Json<PodResponse> {
    Json(PodResponse {
        pod: state.config.pod_name.clone(),
        context_root: state.config.context_root.display().to_string(),
        agents: context::list_agents(&state.config.context_root).await,
        providers: state.registry.names(),
    })
}

fn admin_error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Mask an API key for display: keep the first and last four characters
/// of long keys, hide short ones entirely.
fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
