//! Upstream URL construction
//!
//! Rewrites the inbound path onto the provider's base URL. Many provider
//! base URLs already embed `/v1`, so a leading `/v1` on the inbound path is
//! stripped before concatenation. The inbound query string is preserved
//! verbatim. Any other path shape passes through unmodified beyond
//! leading-slash normalization.

use reqwest::Url;

use crate::error::{ProxyError, ProxyResult};

/// Build the upstream target URL from a provider base URL and the inbound
/// request path/query.
pub fn build_upstream_url(
    base_url: &str,
    incoming_path: &str,
    raw_query: Option<&str>,
) -> ProxyResult<Url> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| ProxyError::MisconfiguredProvider(format!("invalid provider URL: {e}")))?;
    if !url.has_host() {
        return Err(ProxyError::MisconfiguredProvider(format!(
            "invalid provider URL: {base_url:?}"
        )));
    }

    let mut suffix = if incoming_path.starts_with('/') {
        incoming_path.to_string()
    } else {
        format!("/{incoming_path}")
    };
    if let Some(stripped) = suffix.strip_prefix("/v1/") {
        suffix = format!("/{stripped}");
    } else if suffix == "/v1" {
        suffix = "/".to_string();
    }

    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}{suffix}"));
    url.set_query(raw_query);
    Ok(url)
}
