//! # HTTP Gateway
//!
//! Exposes the orchestrator over HTTP:
//!
//! - `POST /generate-faq` with body `{"urls": [...]}` and an optional
//!   `User-Id` header, answering `{"faq": [[question, answer], ...]}`.
//! - `GET /hello`, a liveness probe.
//!
//! Both routes are also mounted under the configured route prefix (`/api` by
//! default). Errors are returned as `{"error": <message>, "kind": <kind>}`.

mod server;

pub use server::{router as gateway_router, run as run_gateway};

use crate::config::ServerConfig;
use crate::error::GenerateError;
use crate::orchestrator::Orchestrator;
use crate::types::FaqEntry;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Identity used when a request carries no `User-Id` header.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Header naming the caller for rate limiting.
pub const USER_ID_HEADER: &str = "user-id";

/// State shared by all request handlers.
pub struct GatewayState {
    orchestrator: Arc<Orchestrator>,
    config: ServerConfig,
}

/// Thread-safe shared gateway reference for axum handlers.
pub type SharedGateway = Arc<GatewayState>;

impl GatewayState {
    pub fn new(orchestrator: Arc<Orchestrator>, config: ServerConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub fn shared(self) -> SharedGateway {
        Arc::new(self)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Batch deadline, or `None` when disabled.
    pub fn batch_timeout(&self) -> Option<Duration> {
        (self.config.batch_timeout_secs > 0)
            .then(|| Duration::from_secs(self.config.batch_timeout_secs))
    }
}

/// Body of `POST /generate-faq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateFaqRequest {
    pub urls: Vec<String>,
}

/// Successful response of `POST /generate-faq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateFaqResponse {
    pub faq: Vec<[String; 2]>,
}

impl GenerateFaqResponse {
    pub fn from_entries(entries: &[FaqEntry]) -> Self {
        Self {
            faq: entries.iter().map(FaqEntry::to_wire).collect(),
        }
    }
}

/// An error rendered as a JSON body with a matching status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }
}

/// HTTP status for a machine-readable error kind.
pub fn status_for_kind(kind: &str) -> StatusCode {
    match kind {
        "empty_batch" | "invalid_references" | "invalid_request" => StatusCode::BAD_REQUEST,
        "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        let kind = err.kind();
        Self {
            status: status_for_kind(kind),
            kind,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for_kind("empty_batch"), StatusCode::BAD_REQUEST);
        assert_eq!(status_for_kind("invalid_references"), StatusCode::BAD_REQUEST);
        assert_eq!(status_for_kind("rate_limited"), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_for_kind("store_unavailable"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for_kind("deadline_exceeded"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_from_generate_error() {
        let err = ApiError::from(GenerateError::Store(StoreError::Backend {
            message: "locked".into(),
        }));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind, "store_unavailable");
        assert!(err.message.contains("locked"));
    }

    #[test]
    fn test_response_wire_format() {
        let entries = vec![FaqEntry {
            question: "What is it?".into(),
            answer: "A tool.".into(),
            index: 6,
        }];
        let json = serde_json::to_value(GenerateFaqResponse::from_entries(&entries)).unwrap();
        assert_eq!(json, serde_json::json!({"faq": [["6. What is it?", "A tool."]]}));
    }
}
