//! Token usage extraction from upstream response bodies
//!
//! Two entry points matching the two response shapes the proxy relays:
//! buffered JSON bodies and SSE streams. OpenAI-style streams carry
//! cumulative usage in the final data chunk before `data: [DONE]`, so the
//! SSE scan keeps the last usage-bearing payload it sees.

use serde::{Deserialize, Serialize};

/// Token counts from an OpenAI-compatible response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Whether any tokens were counted.
    pub fn has_tokens(&self) -> bool {
        self.prompt_tokens > 0 || self.completion_tokens > 0
    }
}

#[derive(Debug, Deserialize)]
struct UsageEnvelope {
    usage: Option<Usage>,
}

/// Parse usage from a non-streamed JSON response body.
///
/// A body without a `usage` object yields zero usage; a body that is not
/// JSON at all is a genuine parse error.
pub fn extract_usage(body: &[u8]) -> Result<Usage, serde_json::Error> {
    let envelope: UsageEnvelope = serde_json::from_slice(body)?;
    Ok(envelope.usage.unwrap_or_default())
}

/// Scan SSE data lines for the last one carrying a `usage` field.
///
/// Lines without the `data: ` prefix, the `[DONE]` sentinel, and payloads
/// that fail to decode are all skipped.
pub fn extract_usage_from_sse(stream: &[u8]) -> Usage {
    let mut last = Usage::default();
    for line in stream.split(|&b| b == b'\n') {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        let Some(payload) = line.strip_prefix("data: ") else {
            continue;
        };
        if payload == "[DONE]" {
            continue;
        }
        if let Ok(envelope) = serde_json::from_str::<UsageEnvelope>(payload) {
            if let Some(usage) = envelope.usage {
                last = usage;
            }
        }
    }
    last
}
