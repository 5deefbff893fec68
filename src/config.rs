//! Configuration management for Warden
//!
//! Configuration is loaded from environment variables. Provider credentials
//! and base URLs have their own overlay step in the registry
//! (`load_from_env`); this covers process-level settings only.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Proxy API port
    pub port: u16,
    /// Admin API port
    pub admin_port: u16,

    /// Root directory of per-agent context directories
    pub context_root: PathBuf,
    /// Directory holding providers.json
    pub auth_dir: PathBuf,

    /// Pod name reported by the admin API
    pub pod_name: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("WARDEN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("WARDEN_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid WARDEN_PORT")?,
            admin_port: env::var("WARDEN_ADMIN_PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .context("Invalid WARDEN_ADMIN_PORT")?,

            context_root: env::var("WARDEN_CONTEXT_ROOT")
                .unwrap_or_else(|_| "/warden/context".to_string())
                .into(),
            auth_dir: env::var("WARDEN_AUTH_DIR")
                .unwrap_or_else(|_| "/warden/auth".to_string())
                .into(),

            pod_name: env::var("WARDEN_POD").ok().filter(|v| !v.is_empty()),
        })
    }
}
