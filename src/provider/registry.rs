//! Provider registry
//!
//! Concurrency-safe store of upstream provider configurations. Loaded from
//! `providers.json` at startup, overlaid by environment variables (env wins),
//! and mutable at runtime through the admin API. Every mutation persists back
//! to disk via [`ProviderRegistry::save_to_file`].
//!
//! Uses `RwLock` for interior mutability so concurrent request-path reads do
//! not block each other; all accessors return defensive copies.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, ProxyResult};
use crate::provider::{
    normalize_name, Provider, ProviderConfig, ENV_BASE_URL_MAP, ENV_KEY_MAP,
};

/// On-disk shape of `providers.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProvidersFile {
    #[serde(default)]
    providers: HashMap<String, ProviderConfig>,
}

/// Registry of known providers; safe for concurrent use.
pub struct ProviderRegistry {
    inner: RwLock<HashMap<String, Provider>>,
    auth_dir: Option<PathBuf>,
}

impl ProviderRegistry {
    /// Create an empty registry. `auth_dir` is where `providers.json` lives;
    /// without one, file load is a no-op and save fails.
    pub fn new(auth_dir: Option<PathBuf>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            auth_dir,
        }
    }

    /// Load providers from `providers.json` in the auth directory.
    ///
    /// A missing file is not an error; malformed JSON is fatal.
    pub fn load_from_file(&self) -> anyhow::Result<()> {
        let Some(dir) = &self.auth_dir else {
            return Ok(());
        };
        let path = dir.join("providers.json");
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).context("read providers.json"),
        };

        let file: ProvidersFile =
            serde_json::from_str(&data).context("parse providers.json")?;

        let mut inner = self.inner.write().expect("registry lock poisoned");
        for (name, cfg) in file.providers {
            let n = normalize_name(&name);
            if n.is_empty() {
                continue;
            }
            inner.insert(n.clone(), Provider::from_config(&n, cfg));
        }
        Ok(())
    }

    /// Overlay well-known provider keys and base URLs from the environment.
    /// Env values win over whatever the file supplied.
    pub fn load_from_env(&self) {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        for (env_key, name) in ENV_BASE_URL_MAP {
            let Ok(v) = std::env::var(env_key) else {
                continue;
            };
            let v = v.trim().to_string();
            if v.is_empty() {
                continue;
            }
            let p = inner
                .entry(name.to_string())
                .or_insert_with(|| Provider::from_config(name, ProviderConfig::default()));
            p.base_url = v;
        }

        for (env_key, name) in ENV_KEY_MAP {
            let Ok(v) = std::env::var(env_key) else {
                continue;
            };
            let v = v.trim().to_string();
            if v.is_empty() {
                continue;
            }
            let p = inner
                .entry(name.to_string())
                .or_insert_with(|| Provider::from_config(name, ProviderConfig::default()));
            p.api_key = v;
        }
    }

    /// Look up one provider by name. Returns a copy.
    pub fn get(&self, name: &str) -> ProxyResult<Provider> {
        let n = normalize_name(name);
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .get(&n)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownProvider(name.to_string()))
    }

    /// Upsert a provider, applying well-known defaults for unset fields.
    pub fn set(&self, name: &str, cfg: ProviderConfig) {
        let n = normalize_name(name);
        if n.is_empty() {
            return;
        }
        let provider = Provider::from_config(&n, cfg);
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.insert(n, provider);
    }

    /// Remove a provider. Returns whether it existed.
    pub fn delete(&self, name: &str) -> bool {
        let n = normalize_name(name);
        if n.is_empty() {
            return false;
        }
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.remove(&n).is_some()
    }

    /// Snapshot of all providers, keyed and ordered by name.
    pub fn all(&self) -> BTreeMap<String, Provider> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Sorted provider names.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut out: Vec<String> = inner.keys().cloned().collect();
        out.sort();
        out
    }

    /// Persist the current state to `providers.json` for admin edits.
    ///
    /// The snapshot is taken under the read lock; file I/O happens outside it.
    pub fn save_to_file(&self) -> anyhow::Result<()> {
        let Some(dir) = &self.auth_dir else {
            anyhow::bail!("no auth directory configured");
        };
        std::fs::create_dir_all(dir).context("create auth dir")?;

        let providers: HashMap<String, ProviderConfig> = {
            let inner = self.inner.read().expect("registry lock poisoned");
            inner
                .iter()
                .map(|(name, p)| (name.clone(), p.to_config()))
                .collect()
        };

        let data = serde_json::to_string_pretty(&ProvidersFile { providers })
            .context("marshal providers.json")?;
        std::fs::write(dir.join("providers.json"), data).context("write providers.json")?;
        Ok(())
    }
}
