//! Header filtering for proxied requests
//!
//! Hop-by-hop headers stay on their connection; the client's Authorization
//! header is owned entirely by the credential-injection step and is never
//! forwarded upstream.

use axum::http::header::{HeaderMap, HeaderName, AUTHORIZATION};

/// Hop-by-hop headers that must never cross the proxy.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is hop-by-hop.
pub fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Headers to forward upstream: everything inbound except hop-by-hop
/// headers and Authorization.
pub fn filter_request_headers(src: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in src {
        if is_hop_by_hop_header(name) || name == AUTHORIZATION {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers to relay back to the client: everything from the upstream
/// response except hop-by-hop headers. Multi-valued headers such as
/// `Set-Cookie` are relayed in full.
pub fn filter_response_headers(src: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in src {
        if is_hop_by_hop_header(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
