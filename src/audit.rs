//! Audit log emission
//!
//! One JSON line per lifecycle event, written to a configurable sink
//! (stdout in production). The audit trail is a product surface for
//! downstream governance tooling, kept separate from `tracing` operational
//! logs. Emission must never block or fail a request; write errors are
//! dropped on the floor.

use std::io::Write;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Token counts and estimated cost for a single LLM request.
#[derive(Debug, Clone, Copy)]
pub struct CostInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    ts: String,
    request_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    agent_id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens_out: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "str::is_empty")]
    error: &'a str,
}

impl<'a> AuditEntry<'a> {
    fn new(kind: &'a str, request_id: &'a str, agent_id: &'a str, model: &'a str) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            request_id,
            agent_id,
            kind,
            model,
            latency_ms: None,
            status_code: None,
            tokens_in: None,
            tokens_out: None,
            cost_usd: None,
            error: "",
        }
    }
}

/// Structured JSON-lines audit writer.
pub struct AuditLog {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl AuditLog {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// An audit log that writes to stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// An audit log that discards everything. Test convenience.
    pub fn sink() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// New unique ID tying together the records of one request.
    pub fn new_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Record the start of a request.
    pub fn log_request(&self, request_id: &str, agent_id: &str, model: &str) {
        self.write(AuditEntry::new("request", request_id, agent_id, model));
    }

    /// Record a completed request, with token/cost detail when cost
    /// tracking produced any.
    pub fn log_response(
        &self,
        request_id: &str,
        agent_id: &str,
        model: &str,
        status_code: u16,
        latency_ms: u64,
        cost: Option<CostInfo>,
    ) {
        let mut entry = AuditEntry::new("response", request_id, agent_id, model);
        entry.status_code = Some(status_code);
        entry.latency_ms = Some(latency_ms);
        if let Some(ci) = cost {
            entry.tokens_in = Some(ci.input_tokens);
            entry.tokens_out = Some(ci.output_tokens);
            entry.cost_usd = Some(ci.cost_usd);
        }
        self.write(entry);
    }

    /// Record a terminal failure.
    pub fn log_error(
        &self,
        request_id: &str,
        agent_id: &str,
        model: &str,
        status_code: u16,
        latency_ms: u64,
        detail: &str,
    ) {
        let mut entry = AuditEntry::new("error", request_id, agent_id, model);
        entry.status_code = Some(status_code);
        entry.latency_ms = Some(latency_ms);
        entry.error = detail;
        self.write(entry);
    }

    fn write(&self, entry: AuditEntry<'_>) {
        let Ok(line) = serde_json::to_string(&entry) else {
            return;
        };
        if let Ok(mut w) = self.writer.lock() {
            let _ = writeln!(w, "{line}");
        }
    }
}
