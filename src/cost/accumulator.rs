//! In-memory cost accumulator
//!
//! Aggregates per-request usage into (agent, provider, model) buckets.
//! Totals only grow for the process lifetime; there is no eviction and no
//! reset short of a restart. Written by every completed request and read by
//! the admin cost views, so access goes through an `RwLock`.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

/// One (agent, provider, model) cost bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostEntry {
    pub agent_id: String,
    pub provider: String,
    pub model: String,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
    pub request_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    agent_id: String,
    provider: String,
    model: String,
}

/// Aggregates per-request cost data in memory. Thread-safe.
#[derive(Default)]
pub struct CostAccumulator {
    buckets: RwLock<HashMap<BucketKey, CostEntry>>,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one request's usage to the matching bucket, creating it if absent.
    pub fn record(
        &self,
        agent_id: &str,
        provider: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cost_usd: f64,
    ) {
        let key = BucketKey {
            agent_id: agent_id.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
        };
        let mut buckets = self.buckets.write().expect("accumulator lock poisoned");
        let entry = buckets.entry(key).or_insert_with(|| CostEntry {
            agent_id: agent_id.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            ..Default::default()
        });
        entry.total_input_tokens += input_tokens;
        entry.total_output_tokens += output_tokens;
        entry.total_cost_usd += cost_usd;
        entry.request_count += 1;
    }

    /// All cost entries for one agent, sorted by provider/model.
    pub fn by_agent(&self, agent_id: &str) -> Vec<CostEntry> {
        let buckets = self.buckets.read().expect("accumulator lock poisoned");
        let mut out: Vec<CostEntry> = buckets
            .values()
            .filter(|e| e.agent_id == agent_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            format!("{}/{}", a.provider, a.model).cmp(&format!("{}/{}", b.provider, b.model))
        });
        out
    }

    /// Cost entries grouped by agent, each group sorted by provider/model.
    pub fn all(&self) -> HashMap<String, Vec<CostEntry>> {
        let buckets = self.buckets.read().expect("accumulator lock poisoned");
        let mut grouped: HashMap<String, Vec<CostEntry>> = HashMap::new();
        for entry in buckets.values() {
            grouped
                .entry(entry.agent_id.clone())
                .or_default()
                .push(entry.clone());
        }
        for entries in grouped.values_mut() {
            entries.sort_by(|a, b| {
                format!("{}/{}", a.provider, a.model).cmp(&format!("{}/{}", b.provider, b.model))
            });
        }
        grouped
    }

    /// Sum of all recorded costs across all agents.
    pub fn total_cost(&self) -> f64 {
        let buckets = self.buckets.read().expect("accumulator lock poisoned");
        buckets.values().map(|e| e.total_cost_usd).sum()
    }
}
