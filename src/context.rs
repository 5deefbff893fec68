//! Per-agent context loading
//!
//! Each agent gets a directory under the context root containing its mounted
//! contract and metadata files: `AGENTS.md`, `WARDEN.md`, `metadata.json`.
//! The metadata `token` field is the stored credential reference used for
//! secret validation. Lookup failure is an authorization failure (403),
//! never an authentication failure (401).

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{ProxyError, ProxyResult};

/// One agent's mounted contract and metadata.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub agent_id: String,
    pub agents_md: String,
    pub warden_md: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentContext {
    /// The stored credential reference (`metadata.token`), when present
    /// and a string.
    pub fn metadata_token(&self) -> &str {
        self.metadata
            .get("token")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

/// Resolves per-agent context by ID.
///
/// Implemented over the filesystem in production; tests substitute an
/// in-memory loader.
#[async_trait]
pub trait ContextLoader: Send + Sync {
    async fn load(&self, agent_id: &str) -> ProxyResult<AgentContext>;
}

/// Loads agent context from `<root>/<agent_id>/`.
pub struct FsContextLoader {
    root: PathBuf,
}

impl FsContextLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContextLoader for FsContextLoader {
    async fn load(&self, agent_id: &str) -> ProxyResult<AgentContext> {
        let dir = self.root.join(agent_id);

        let agents_md = tokio::fs::read_to_string(dir.join("AGENTS.md"))
            .await
            .map_err(|e| {
                ProxyError::UnknownAgent(format!("load agent context {agent_id:?}: AGENTS.md: {e}"))
            })?;

        let warden_md = tokio::fs::read_to_string(dir.join("WARDEN.md"))
            .await
            .map_err(|e| {
                ProxyError::UnknownAgent(format!("load agent context {agent_id:?}: WARDEN.md: {e}"))
            })?;

        let meta_raw = tokio::fs::read_to_string(dir.join("metadata.json"))
            .await
            .map_err(|e| {
                ProxyError::UnknownAgent(format!(
                    "load agent context {agent_id:?}: metadata.json: {e}"
                ))
            })?;

        let metadata: HashMap<String, serde_json::Value> = serde_json::from_str(&meta_raw)
            .map_err(|e| {
                ProxyError::UnknownAgent(format!(
                    "load agent context {agent_id:?}: parse metadata: {e}"
                ))
            })?;

        Ok(AgentContext {
            agent_id: agent_id.to_string(),
            agents_md,
            warden_md,
            metadata,
        })
    }
}

/// List agent IDs that have a context directory under the root.
///
/// Used by the admin pod view. Missing root yields an empty list.
pub async fn list_agents(root: &std::path::Path) -> Vec<String> {
    let mut out = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(root).await else {
        return out;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            if let Some(name) = entry.file_name().to_str() {
                out.push(name.to_string());
            }
        }
    }
    out.sort();
    out
}
