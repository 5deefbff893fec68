//! Proxy pipeline integration tests
//!
//! Exercise the full request lifecycle against a wiremock upstream:
//! credential substitution, model rewriting, response relaying, streaming
//! usage extraction, cost recording, and the error status mapping.

use axum::http::{HeaderName, HeaderValue};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{constants, NoHeader, TestHarness};

fn auth_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&TestHarness::bearer()).unwrap(),
    )
}

#[tokio::test]
async fn test_end_to_end_anthropic_x_api_key() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, "bot:goodsecret");

    let upstream = MockServer::start().await;
    harness.add_provider(
        "anthropic",
        &upstream.uri(),
        constants::TEST_ANTHROPIC_KEY,
        None, // defaults to x-api-key for anthropic
    );

    // The upstream must see the real key in x-api-key, no Authorization
    // header at all, and the provider prefix stripped from the model.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("x-api-key", constants::TEST_ANTHROPIC_KEY))
        .and(NoHeader("authorization"))
        .and(body_partial_json(json!({ "model": "claude-sonnet-4" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({
            "model": "anthropic/claude-sonnet-4",
            "messages": [{"role": "user", "content": "hello"}]
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], "msg_1");
    assert_eq!(body["usage"]["prompt_tokens"], 100);

    // One bucket for (bot, anthropic, claude-sonnet-4), costed at the
    // claude-sonnet-4 rate of $3/$15 per MTok.
    let entries = harness.state.accumulator.by_agent(constants::TEST_AGENT);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].provider, "anthropic");
    assert_eq!(entries[0].model, "claude-sonnet-4");
    assert_eq!(entries[0].total_input_tokens, 100);
    assert_eq!(entries[0].total_output_tokens, 50);
    assert_eq!(entries[0].request_count, 1);
    let expected_cost = 100.0 / 1e6 * 3.0 + 50.0 / 1e6 * 15.0;
    assert!((entries[0].total_cost_usd - expected_cost).abs() < 1e-12);
}

#[tokio::test]
async fn test_bearer_provider_injects_real_key() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header(
            "authorization",
            format!("Bearer {}", constants::TEST_OPENAI_KEY).as_str(),
        ))
        .and(body_partial_json(json!({ "model": "gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_nested_model_path_forwarded_to_openrouter() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openrouter", &upstream.uri(), "sk-or", None);

    // Only the first path segment is the provider; the rest of the model
    // identifier goes upstream untouched.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(
            json!({ "model": "anthropic/claude-3-5" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "or-1" })))
        .expect(1)
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openrouter/anthropic/claude-3-5", "messages": [] }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_sse_stream_relayed_and_last_usage_recorded() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);

    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}],\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":1,\"total_tokens\":2}}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"usage\":{\"prompt_tokens\":20,\"completion_tokens\":10,\"total_tokens\":30}}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [], "stream": true }))
        .await;

    response.assert_status_ok();
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("text/event-stream"));
    assert!(response.text().contains("data: [DONE]"));

    // The last usage-bearing chunk wins, not the first.
    let entries = harness.state.accumulator.by_agent(constants::TEST_AGENT);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].total_input_tokens, 20);
    assert_eq!(entries[0].total_output_tokens, 10);
}

#[tokio::test]
async fn test_upstream_error_status_relayed_verbatim() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "rate limited" } })),
        )
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 429);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "rate limited");

    // No usage in the error body means nothing recorded.
    assert!(harness
        .state
        .accumulator
        .by_agent(constants::TEST_AGENT)
        .is_empty());
}

#[tokio::test]
async fn test_custom_headers_forwarded_hop_by_hop_not() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("x-request-tag", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cmpl-1" })))
        .expect(1)
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .add_header(
            HeaderName::from_static("x-request-tag"),
            HeaderValue::from_static("abc"),
        )
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_repeated_response_headers_relayed_in_full() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2")
                .set_body_json(json!({ "id": "cmpl-1" })),
        )
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    response.assert_status_ok();
    let cookies: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
    assert_eq!(cookies, vec!["a=1", "b=2"]);
}

#[tokio::test]
async fn test_missing_authorization_is_401() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/chat/completions")
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "invalid bearer token");
}

#[tokio::test]
async fn test_token_without_separator_is_401() {
    let harness = TestHarness::new();

    let (name, _) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, HeaderValue::from_static("Bearer no-separator"))
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_unknown_agent_is_403() {
    let harness = TestHarness::new();
    // No agent context written.

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 403);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "agent context not found");
}

#[tokio::test]
async fn test_wrong_secret_is_403() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, "bot:othersecret");

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 403);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "invalid agent secret");
}

#[tokio::test]
async fn test_stored_token_with_bearer_prefix_accepted() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, "Bearer bot:goodsecret");

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cmpl-1" })))
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_non_json_body_is_400() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .text("this is not json")
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_missing_model_is_400() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "missing model field");
}

#[tokio::test]
async fn test_unprefixed_model_is_400() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "no-slash-here", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_unknown_provider_is_502() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "nope/some-model", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 502);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "unknown provider");
}

#[tokio::test]
async fn test_bearer_provider_without_key_is_502() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);
    harness.add_provider("openai", "http://localhost:1", "", None);

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 502);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "provider API key not configured");
}

#[tokio::test]
async fn test_unsupported_auth_mode_is_502() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);
    harness.add_provider("custom", "http://localhost:1", "key", Some("hmac"));

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "custom/some-model", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 502);
}

#[tokio::test]
async fn test_unreachable_upstream_is_502() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);
    // Nothing listens on port 1.
    harness.add_provider("openai", "http://127.0.0.1:1", constants::TEST_OPENAI_KEY, None);

    let (name, value) = auth_header();
    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await;

    assert_eq!(response.status_code().as_u16(), 502);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "upstream request failed");
}

#[tokio::test]
async fn test_audit_trail_request_and_response() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })))
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/gpt-4o", "messages": [] }))
        .await
        .assert_status_ok();

    let entries = harness.audit.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["type"], "request");
    assert_eq!(entries[0]["agent_id"], constants::TEST_AGENT);
    assert_eq!(entries[0]["model"], "openai/gpt-4o");
    assert_eq!(entries[1]["type"], "response");
    assert_eq!(entries[1]["status_code"], 200);
    assert_eq!(entries[1]["tokens_in"], 10);
    assert_eq!(entries[1]["tokens_out"], 5);
    // Both records carry the same request id.
    assert_eq!(entries[0]["request_id"], entries[1]["request_id"]);
}

#[tokio::test]
async fn test_audit_trail_on_failure() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let (name, value) = auth_header();
    harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "nope/some-model", "messages": [] }))
        .await;

    let entries = harness.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "error");
    assert_eq!(entries[0]["status_code"], 502);
    assert_eq!(entries[0]["model"], "nope/some-model");
}

#[tokio::test]
async fn test_pricing_gap_records_zero_cost() {
    let harness = TestHarness::new();
    harness.add_agent(constants::TEST_AGENT, constants::TEST_SECRET);

    let upstream = MockServer::start().await;
    harness.add_provider("openai", &upstream.uri(), constants::TEST_OPENAI_KEY, None);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })))
        .mount(&upstream)
        .await;

    let (name, value) = auth_header();
    harness
        .server
        .post("/v1/chat/completions")
        .add_header(name, value)
        .json(&json!({ "model": "openai/totally-unpriced-model", "messages": [] }))
        .await
        .assert_status_ok();

    let entries = harness.state.accumulator.by_agent(constants::TEST_AGENT);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].total_input_tokens, 10);
    assert_eq!(entries[0].total_cost_usd, 0.0);
}
