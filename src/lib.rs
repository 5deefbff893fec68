//! Warden - governance reverse proxy for agent LLM traffic
//!
//! Agents hold only a scoped dummy credential; Warden holds the real
//! provider keys and is the sole path to inference. This library provides
//! the proxy pipeline, provider registry, cost accounting, and the HTTP
//! surfaces (proxy API plus admin API).

pub mod audit;
pub mod config;
pub mod context;
pub mod cost;
pub mod error;
pub mod identity;
pub mod provider;
pub mod proxy;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::audit::AuditLog;
pub use crate::config::Config;
pub use crate::context::{AgentContext, ContextLoader, FsContextLoader};
pub use crate::cost::{CostAccumulator, PricingTable};
pub use crate::provider::ProviderRegistry;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub start_time: Instant,
    /// Upstream provider configurations, shared with the admin API
    pub registry: Arc<ProviderRegistry>,
    /// Per-agent usage buckets, shared with the admin API
    pub accumulator: Arc<CostAccumulator>,
    /// Static (provider, model) -> rate table
    pub pricing: Arc<PricingTable>,
    /// Structured audit trail; called at request start and completion
    pub audit: Arc<AuditLog>,
    /// Resolves agent identity material; filesystem-backed in production
    pub context_loader: Arc<dyn ContextLoader>,
}

impl AppState {
    /// Create application state from explicitly constructed collaborators.
    ///
    /// Everything shared is injected so tests can run isolated instances;
    /// nothing is reached through globals.
    pub fn new(
        config: Config,
        registry: Arc<ProviderRegistry>,
        accumulator: Arc<CostAccumulator>,
        pricing: Arc<PricingTable>,
        audit: Arc<AuditLog>,
        context_loader: Arc<dyn ContextLoader>,
    ) -> Result<Self> {
        // Connection pooling for upstream calls. No client-side timeout:
        // long-lived streaming responses are deliberately unbounded.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .build()?;

        Ok(Self {
            config,
            http_client,
            start_time: Instant::now(),
            registry,
            accumulator,
            pricing,
            audit,
            context_loader,
        })
    }
}
