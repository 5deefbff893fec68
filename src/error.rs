//! Error types for Warden
//!
//! This module defines the pipeline error taxonomy and its HTTP rendering.
//! Every failure surfaced to a client uses the body shape
//! `{"error": {"message": "..."}}` with the status code owned by the variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Pipeline and registry errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid bearer token")]
    MalformedCredential(String),

    #[error("agent context not found")]
    UnknownAgent(String),

    #[error("invalid agent secret")]
    SecretMismatch(String),

    #[error("invalid request body: {0}")]
    MalformedRequestBody(String),

    #[error("invalid model field: {0}")]
    MalformedModel(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("provider misconfigured: {0}")]
    MisconfiguredProvider(String),

    #[error("upstream request failed: {0}")]
    UpstreamUnreachable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    /// HTTP status for this failure, per the pipeline state machine.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MalformedCredential(_) => StatusCode::UNAUTHORIZED,
            ProxyError::UnknownAgent(_) | ProxyError::SecretMismatch(_) => StatusCode::FORBIDDEN,
            ProxyError::MalformedRequestBody(_) | ProxyError::MalformedModel(_) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::UnknownProvider(_)
            | ProxyError::MisconfiguredProvider(_)
            | ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable reason sent to the client.
    ///
    /// Detail strings carried by the variants stay out of responses;
    /// they go to the audit log instead.
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::MalformedCredential(_) => "invalid bearer token".to_string(),
            ProxyError::UnknownAgent(_) => "agent context not found".to_string(),
            ProxyError::SecretMismatch(_) => "invalid agent secret".to_string(),
            ProxyError::MalformedRequestBody(msg) => msg.clone(),
            ProxyError::MalformedModel(msg) => msg.clone(),
            ProxyError::UnknownProvider(_) => "unknown provider".to_string(),
            // Misconfiguration messages name the problem (missing key,
            // unsupported auth mode, bad base URL) and never the key itself.
            ProxyError::MisconfiguredProvider(msg) => msg.clone(),
            ProxyError::UpstreamUnreachable(_) => "upstream request failed".to_string(),
            ProxyError::Internal(_) => "internal server error".to_string(),
        }
    }

    /// Detail string for audit records.
    pub fn detail(&self) -> String {
        match self {
            ProxyError::MalformedCredential(msg)
            | ProxyError::UnknownAgent(msg)
            | ProxyError::SecretMismatch(msg)
            | ProxyError::MalformedRequestBody(msg)
            | ProxyError::MalformedModel(msg)
            | ProxyError::UnknownProvider(msg)
            | ProxyError::MisconfiguredProvider(msg)
            | ProxyError::UpstreamUnreachable(msg) => msg.clone(),
            ProxyError::Internal(e) => e.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.client_message());
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type ProxyResult<T> = Result<T, ProxyError>;
