//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use healthmate_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with, mapped to a status and JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing request input: 400 `{"error"}`.
    #[error("{0}")]
    BadRequest(String),

    /// Required configuration is absent: 500 `{"error", "hint"}`.
    #[error("{message}")]
    Config { message: String, hint: String },

    /// An external service failed: 500 `{"error"}` with its message.
    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn config(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Config { message: message.into(), hint: hint.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Config { message, hint } => json!({ "error": message, "hint": hint }),
            other => json!({ "error": other.to_string() }),
        };
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::config("x", "y").status(), StatusCode::INTERNAL_SERVER_ERROR);
        let rag = ApiError::from(RagError::PipelineError("boom".into()));
        assert_eq!(rag.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rag.to_string(), "Pipeline error: boom");
    }
}
