//! Agent credential parsing and validation
//!
//! Agents authenticate with `Authorization: Bearer <agent-id>:<secret>`.
//! The token splits on the first colon only, so secrets may themselves
//! contain colons. Secret comparison is constant-time over the byte content.

use subtle::ConstantTimeEq;

use crate::error::{ProxyError, ProxyResult};

/// Parse an Authorization header value into `(agent_id, secret)`.
///
/// The scheme must be `Bearer` (case-insensitive). The token splits on the
/// first colon; everything after it, colons included, is the secret.
pub fn parse_bearer(header: &str) -> ProxyResult<(String, String)> {
    let header = header.trim();
    if header.is_empty() {
        return Err(ProxyError::MalformedCredential(
            "missing authorization header".to_string(),
        ));
    }

    let (scheme, token) = header.split_once(' ').ok_or_else(|| {
        ProxyError::MalformedCredential("expected Bearer scheme".to_string())
    })?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ProxyError::MalformedCredential(
            "expected Bearer scheme".to_string(),
        ));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ProxyError::MalformedCredential("empty token".to_string()));
    }

    let (agent_id, secret) = token.split_once(':').ok_or_else(|| {
        ProxyError::MalformedCredential("expected <agent-id>:<secret>".to_string())
    })?;
    if agent_id.is_empty() || secret.is_empty() {
        return Err(ProxyError::MalformedCredential(
            "expected <agent-id>:<secret>".to_string(),
        ));
    }

    Ok((agent_id.to_string(), secret.to_string()))
}

/// Validate a presented secret against the stored reference token.
///
/// The stored value may be a bare secret or `agent:secret`, and may carry a
/// leading case-insensitive `bearer ` marker which is stripped first. When it
/// encodes an agent id, that id must match the one derived from the header.
pub fn validate_secret(stored: &str, agent_id: &str, presented: &str) -> ProxyResult<()> {
    let mut stored = stored.trim();
    if stored.is_empty() {
        return Err(ProxyError::SecretMismatch(
            "metadata token missing".to_string(),
        ));
    }

    // Byte-wise prefix check; an ASCII match guarantees the char boundary.
    let bytes = stored.as_bytes();
    if bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"bearer ") {
        stored = stored[7..].trim();
    }

    if let Some((stored_agent, stored_secret)) = stored.split_once(':') {
        if !stored_agent.is_empty() && stored_agent != agent_id {
            return Err(ProxyError::SecretMismatch(
                "token agent mismatch".to_string(),
            ));
        }
        if !constant_time_eq(stored_secret, presented) {
            return Err(ProxyError::SecretMismatch("secret mismatch".to_string()));
        }
        return Ok(());
    }

    if !constant_time_eq(stored, presented) {
        return Err(ProxyError::SecretMismatch("secret mismatch".to_string()));
    }
    Ok(())
}

/// Constant-time string equality. Length inequality may short-circuit;
/// byte content must not.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
