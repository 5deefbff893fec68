//! Upstream provider configuration
//!
//! A provider is one upstream LLM API endpoint: base URL, credential, auth
//! mode, and wire format. Providers come from `providers.json`, are overlaid
//! by environment variables, and can be edited at runtime through the admin
//! API. The registry owns all of them; callers only ever see copies.

pub mod registry;

pub use registry::ProviderRegistry;

use serde::{Deserialize, Serialize};

/// Auth and routing config for one LLM provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// "bearer" (default), "none", "x-api-key"
    #[serde(default)]
    pub auth: String,
    /// "openai" (default), "anthropic"
    #[serde(default)]
    pub api_format: String,
}

/// Raw provider record as it appears in `providers.json` or an admin edit.
///
/// All fields are optional; [`Provider::from_config`] applies the well-known
/// defaults. Keeping the raw shape separate makes the defaulting order
/// (file, then env, then admin edit) an explicit function rather than ad hoc
/// mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_format: Option<String>,
}

impl Provider {
    /// Build a provider from a raw record, filling unset fields from the
    /// well-known-provider table. `name` must already be normalized.
    pub fn from_config(name: &str, cfg: ProviderConfig) -> Self {
        let base_url = cfg
            .base_url
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| known_base_url(name).unwrap_or_default().to_string());
        let auth = cfg
            .auth
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_auth(name).to_string());
        let api_format = cfg
            .api_format
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_api_format(name).to_string());

        Self {
            name: name.to_string(),
            base_url,
            api_key: cfg.api_key.unwrap_or_default(),
            auth,
            api_format,
        }
    }

    /// The raw record for persistence; the name lives in the map key.
    pub fn to_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: Some(self.base_url.clone()),
            api_key: Some(self.api_key.clone()),
            auth: Some(self.auth.clone()),
            api_format: Some(self.api_format.clone()),
        }
    }
}

/// How the provider credential is attached to upstream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `Authorization: Bearer <api_key>`
    Bearer,
    /// `x-api-key: <api_key>` (Anthropic-style), no Authorization header
    XApiKey,
    /// No credential header at all (local backends such as Ollama)
    None,
}

impl AuthMode {
    /// Parse a configured auth string. Empty/unset means bearer.
    /// Unknown values yield `None` and are rejected at injection time.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "bearer" => Some(AuthMode::Bearer),
            "x-api-key" => Some(AuthMode::XApiKey),
            "none" => Some(AuthMode::None),
            _ => None,
        }
    }
}

/// Normalize a provider name: lower-cased, trimmed.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Base URLs for providers that work without explicit configuration.
pub fn known_base_url(name: &str) -> Option<&'static str> {
    match name {
        "openai" => Some("https://api.openai.com/v1"),
        "anthropic" => Some("https://api.anthropic.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://ollama:11434/v1"),
        _ => None,
    }
}

fn default_auth(name: &str) -> &'static str {
    match normalize_name(name).as_str() {
        "ollama" => "none",
        "anthropic" => "x-api-key",
        _ => "bearer",
    }
}

fn default_api_format(name: &str) -> &'static str {
    if normalize_name(name) == "anthropic" {
        "anthropic"
    } else {
        "openai"
    }
}

/// Environment variables that supply API keys, by provider name.
pub const ENV_KEY_MAP: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "openai"),
    ("ANTHROPIC_API_KEY", "anthropic"),
    ("OPENROUTER_API_KEY", "openrouter"),
];

/// Environment variables that supply base URLs, by provider name.
pub const ENV_BASE_URL_MAP: &[(&str, &str)] = &[
    ("OPENAI_BASE_URL", "openai"),
    ("ANTHROPIC_BASE_URL", "anthropic"),
    ("OPENROUTER_BASE_URL", "openrouter"),
    ("OLLAMA_BASE_URL", "ollama"),
];
