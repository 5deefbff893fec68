//! Chat completions proxy handler
//!
//! Implements the request pipeline end to end. Terminal failures before the
//! upstream response starts map to the error taxonomy; once headers are
//! relayed, stream failures can only be logged. Usage extraction and cost
//! recording run after the body finishes, off the captured copy, so client
//! streaming is never delayed by accounting.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use futures::StreamExt;
use tracing::{info, warn};

use crate::{
    audit::{AuditLog, CostInfo},
    cost::{extract_usage, extract_usage_from_sse, Usage},
    error::{ProxyError, ProxyResult},
    identity,
    provider::AuthMode,
    proxy::headers::{filter_request_headers, filter_response_headers},
    proxy::url::build_upstream_url,
    AppState,
};

/// Identity and model resolved so far, for audit records on failure paths.
#[derive(Default)]
struct RequestTrace {
    agent_id: String,
    model: String,
}

/// Proxy an OpenAI-compatible chat completion request to the provider
/// encoded in the model prefix.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let request_id = AuditLog::new_request_id();
    let mut trace = RequestTrace::default();

    match pipeline(&state, request, &request_id, &mut trace, start).await {
        Ok(response) => response,
        Err(err) => {
            let status = err.status();
            warn!(
                request_id = %request_id,
                agent_id = %trace.agent_id,
                model = %trace.model,
                status = %status,
                error = %err.detail(),
                "Proxy request failed"
            );
            state.audit.log_error(
                &request_id,
                &trace.agent_id,
                &trace.model,
                status.as_u16(),
                elapsed_ms(start),
                &err.detail(),
            );
            err.into_response()
        }
    }
}

async fn pipeline(
    state: &Arc<AppState>,
    request: Request,
    request_id: &str,
    trace: &mut RequestTrace,
    start: Instant,
) -> ProxyResult<Response> {
    let (parts, body) = request.into_parts();

    // Authenticate: parse the scoped dummy credential.
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let (agent_id, secret) = identity::parse_bearer(auth_header)?;
    trace.agent_id = agent_id.clone();

    // Resolve the agent and validate the presented secret against its
    // stored reference. Unknown agents are 403, never 401.
    let ctx = state.context_loader.load(&agent_id).await?;
    identity::validate_secret(ctx.metadata_token(), &agent_id, &secret)?;

    // Parse the body far enough to rewrite the model field; everything else
    // passes through untouched.
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ProxyError::MalformedRequestBody(format!("failed to read request body: {e}")))?;
    let mut payload: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&body_bytes)
            .map_err(|e| ProxyError::MalformedRequestBody(format!("invalid JSON body: {e}")))?;

    let requested_model = payload
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if requested_model.is_empty() {
        return Err(ProxyError::MalformedModel("missing model field".to_string()));
    }
    trace.model = requested_model.clone();

    let (provider_name, upstream_model) = split_model(&requested_model)?;
    let provider = state.registry.get(&provider_name)?;

    payload.insert(
        "model".to_string(),
        serde_json::Value::String(upstream_model.clone()),
    );
    let out_body = serde_json::to_vec(&payload)
        .map_err(|e| ProxyError::Internal(anyhow::anyhow!("encode upstream body: {e}")))?;

    let target_url = build_upstream_url(
        &provider.base_url,
        parts.uri.path(),
        parts.uri.query(),
    )?;

    // Outbound headers: inbound minus hop-by-hop and the agent credential,
    // then the real provider credential per auth mode.
    let mut out_headers = filter_request_headers(&parts.headers);
    out_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    match AuthMode::parse(&provider.auth) {
        Some(AuthMode::Bearer) => {
            let key = provider.api_key.trim();
            if key.is_empty() {
                return Err(ProxyError::MisconfiguredProvider(
                    "provider API key not configured".to_string(),
                ));
            }
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                ProxyError::MisconfiguredProvider("provider API key not header-safe".to_string())
            })?;
            out_headers.insert(AUTHORIZATION, value);
        }
        Some(AuthMode::XApiKey) => {
            let key = provider.api_key.trim();
            if key.is_empty() {
                return Err(ProxyError::MisconfiguredProvider(
                    "provider API key not configured".to_string(),
                ));
            }
            let value = HeaderValue::from_str(key).map_err(|_| {
                ProxyError::MisconfiguredProvider("provider API key not header-safe".to_string())
            })?;
            out_headers.insert("x-api-key", value);
        }
        Some(AuthMode::None) => {
            // Local backends take no credential; the client's Authorization
            // header was already dropped by the request filter.
            out_headers.remove(AUTHORIZATION);
        }
        None => {
            return Err(ProxyError::MisconfiguredProvider(format!(
                "unsupported provider auth: {}",
                provider.auth
            )));
        }
    }

    state
        .audit
        .log_request(request_id, &agent_id, &requested_model);
    info!(
        request_id = %request_id,
        agent_id = %agent_id,
        provider = %provider_name,
        model = %requested_model,
        "Forwarding chat completion request"
    );

    let upstream = state
        .http_client
        .post(target_url)
        .headers(out_headers)
        .body(out_body)
        .send()
        .await
        .map_err(|e| ProxyError::UpstreamUnreachable(e.to_string()))?;

    Ok(relay_response(
        state.clone(),
        upstream,
        RelayContext {
            request_id: request_id.to_string(),
            agent_id,
            provider: provider_name,
            upstream_model,
            requested_model,
            start,
        },
    ))
}

/// Per-request values the streaming relay needs after the handler returns.
struct RelayContext {
    request_id: String,
    agent_id: String,
    provider: String,
    upstream_model: String,
    requested_model: String,
    start: Instant,
}

/// Relay the upstream response to the client while teeing every chunk into
/// a capture buffer. When the body completes, extract usage from the capture
/// and record cost; a mid-stream failure is logged and terminates the body.
fn relay_response(state: Arc<AppState>, upstream: reqwest::Response, ctx: RelayContext) -> Response {
    let status = upstream.status();
    let relay_headers = filter_response_headers(upstream.headers());
    let is_sse = upstream
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("text/event-stream"))
        .unwrap_or(false);

    let body_stream = async_stream::stream! {
        let mut captured = BytesMut::new();
        let mut stream = upstream.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    captured.extend_from_slice(&bytes);
                    yield Ok(bytes);
                }
                Err(e) => {
                    // Headers are already on the wire; nothing to do but
                    // log and cut the stream.
                    warn!(
                        request_id = %ctx.request_id,
                        agent_id = %ctx.agent_id,
                        model = %ctx.requested_model,
                        error = %e,
                        "Upstream stream failed mid-body"
                    );
                    state.audit.log_error(
                        &ctx.request_id,
                        &ctx.agent_id,
                        &ctx.requested_model,
                        status.as_u16(),
                        elapsed_ms(ctx.start),
                        &format!("stream interrupted: {e}"),
                    );
                    yield Err(e);
                    return;
                }
            }
        }

        let cost = settle_usage(&state, &ctx, is_sse, &captured);
        state.audit.log_response(
            &ctx.request_id,
            &ctx.agent_id,
            &ctx.requested_model,
            status.as_u16(),
            elapsed_ms(ctx.start),
            cost,
        );
        info!(
            request_id = %ctx.request_id,
            agent_id = %ctx.agent_id,
            model = %ctx.requested_model,
            status = %status,
            latency_ms = elapsed_ms(ctx.start),
            "Proxy request completed"
        );
    };

    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        *headers = relay_headers;
    }
    builder
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

/// Best-effort usage extraction and cost recording off the captured body.
/// Parse failures and pricing gaps degrade to no record, never an error.
fn settle_usage(
    state: &AppState,
    ctx: &RelayContext,
    is_sse: bool,
    captured: &[u8],
) -> Option<CostInfo> {
    let usage: Usage = if is_sse {
        extract_usage_from_sse(captured)
    } else {
        extract_usage(captured).unwrap_or_default()
    };
    if !usage.has_tokens() {
        return None;
    }

    let cost_usd = state
        .pricing
        .lookup(&ctx.provider, &ctx.upstream_model)
        .map(|rate| rate.compute(usage.prompt_tokens, usage.completion_tokens))
        .unwrap_or(0.0);
    state.accumulator.record(
        &ctx.agent_id,
        &ctx.provider,
        &ctx.upstream_model,
        usage.prompt_tokens,
        usage.completion_tokens,
        cost_usd,
    );
    Some(CostInfo {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        cost_usd,
    })
}

/// Split the client-supplied model into provider key and upstream model.
///
/// Splits on the first `/` only, so multi-level identifiers such as
/// `openrouter/anthropic/claude-...` keep their nested path.
fn split_model(model: &str) -> ProxyResult<(String, String)> {
    let (provider, upstream) = model
        .trim()
        .split_once('/')
        .ok_or_else(|| {
            ProxyError::MalformedModel(
                "model must be provider-prefixed: <provider>/<model>".to_string(),
            )
        })?;
    if provider.is_empty() || upstream.is_empty() {
        return Err(ProxyError::MalformedModel(
            "model must be provider-prefixed: <provider>/<model>".to_string(),
        ));
    }
    Ok((provider.to_lowercase(), upstream.to_string()))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
