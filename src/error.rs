use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::admission::{Denial, DenyReason};
use crate::llm::LlmError;

// Everything a report request can fail with. Admission denials are domain
// outcomes carried as values; they only become errors at the HTTP edge.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited: {0}")]
    RateLimited(Denial),
    #[error("invalid request: {0}")]
    Invalid(&'static str),
    #[error("report not found")]
    NotFound,
    #[error("report generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("report queue unavailable")]
    QueueClosed,
}

// Upstream data fetches fail per source; the caller folds failures away.
// `provider` names the source for logs, nothing else.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {provider} failed: {err}")]
    Http {
        provider: &'static str,
        #[source]
        err: reqwest::Error,
    },
    #[error("{provider} returned status {status}")]
    Status { provider: &'static str, status: u16 },
    #[error("unexpected payload from {provider}: {err}")]
    Payload {
        provider: &'static str,
        #[source]
        err: reqwest::Error,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::RateLimited(denial) => {
                let retry_secs = denial.retry_after.as_secs();
                let mut body = json!({
                    "error": denial.to_string(),
                    "reason": denial.reason.to_string(),
                    "retry_after_secs": retry_secs,
                });
                if let DenyReason::QuotaExhausted { used, limit } = denial.reason {
                    body["used"] = used.into();
                    body["limit"] = limit.into();
                }
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_secs.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            ApiError::Invalid(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": msg })),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "report not found" })),
            )
                .into_response(),
            ApiError::Generation(err) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response(),
            ApiError::QueueClosed => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "report queue unavailable" })),
            )
                .into_response(),
        }
    }
}
