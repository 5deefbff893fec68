//! Warden - governance reverse proxy for agent LLM traffic
//!
//! This is the main entry point. It wires configuration, the provider
//! registry, cost tracking, and the audit log into two HTTP listeners:
//! the proxy API agents call and the admin API operators call.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use warden::{
    routes, AppState, AuditLog, Config, CostAccumulator, FsContextLoader, PricingTable,
    ProviderRegistry,
};

#[derive(Debug, Parser)]
#[command(name = "warden", about = "Governance proxy for agent LLM traffic")]
struct Cli {
    /// Check proxy API health and exit
    #[arg(long)]
    healthcheck: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if cli.healthcheck {
        return run_healthcheck(&config).await;
    }

    // Initialize tracing. Audit records go to stdout separately; keep
    // operational logs on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!("Starting Warden proxy");

    // Provider registry: file first, then env overlay (env wins).
    // A malformed providers.json is fatal at startup.
    let registry = Arc::new(ProviderRegistry::new(Some(config.auth_dir.clone())));
    registry
        .load_from_file()
        .context("load providers from file")?;
    registry.load_from_env();
    info!(providers = ?registry.names(), "Provider registry loaded");

    let accumulator = Arc::new(CostAccumulator::new());
    let pricing = Arc::new(PricingTable::default());
    let audit = Arc::new(AuditLog::stdout());
    let context_loader = Arc::new(FsContextLoader::new(config.context_root.clone()));

    let state = Arc::new(AppState::new(
        config.clone(),
        registry,
        accumulator,
        pricing,
        audit,
        context_loader,
    )?);

    let api_addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let admin_addr: SocketAddr = format!("{}:{}", config.host, config.admin_port).parse()?;

    let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr).await?;
    info!(api = %api_addr, admin = %admin_addr, "Listening");

    let api_server = axum::serve(api_listener, routes::create_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal());
    let admin_server = axum::serve(admin_listener, routes::create_admin_router(state))
        .with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(api_server, admin_server)?;

    info!("Warden shutdown complete");
    Ok(())
}

/// Probe the proxy API health endpoint, for container health checks.
async fn run_healthcheck(config: &Config) -> Result<()> {
    let host = match config.host.as_str() {
        "0.0.0.0" | "::" | "" => "127.0.0.1",
        other => other,
    };
    let url = format!("http://{}:{}/health", host, config.port);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(3))
        .build()?;
    let response = client.get(&url).send().await.context("health request")?;
    anyhow::ensure!(
        response.status().is_success(),
        "health endpoint returned {}",
        response.status()
    );
    Ok(())
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating shutdown");
        }
    }
}
