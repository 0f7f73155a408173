//! API error taxonomy and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range body or query. The detail is logged, not returned.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("rate limited")]
    RateLimited,

    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(context: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            context,
            source: source.into(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(what) => *what,
            Self::RateLimited => "Too many requests",
            Self::Internal { context, .. } => *context,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal { context, source } => {
                tracing::error!(error = ?source, "{context}");
            }
            Self::InvalidInput(detail) => {
                tracing::debug!(%detail, "rejected request");
            }
            _ => {}
        }
        let body = Json(json!({ "error": self.public_message() }));
        (self.http_status(), body).into_response()
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Fallback for known routes hit with the wrong method.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}
