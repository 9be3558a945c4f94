use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chefgen::basic_models::FieldError;
use serde::Serialize;

use crate::generation::{FailureKind, GenerationError};

pub type WebResult<T> = std::result::Result<T, WebError>;

/// Seconds a client should wait after the AI quota runs out.
pub const QUOTA_RETRY_AFTER_SECS: u32 = 60;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Internal Server Error: {0:#}")]
    Internal(#[from] anyhow::Error),
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Generation failed: {0}")]
    Upstream(#[from] GenerationError),
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        WebError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// The JSON body of every error response.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u32>,
}

impl ErrorBody {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Attach the underlying error text, in debug builds only.
    fn with_detail(mut self, detail: impl FnOnce() -> String) -> Self {
        if cfg!(debug_assertions) {
            self.error = Some(detail());
        }
        self
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        // In development, we want to return the error message
        // In production, we want to return a generic error message
        let (status, body) = match self {
            WebError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::message("Internal server error").with_detail(|| format!("{e:#}")),
                )
            }
            WebError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    errors: Some(errors),
                    ..ErrorBody::message("Validation failed")
                },
            ),
            WebError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorBody::message(message)),
            // Auth failures are always explained
            WebError::Auth(message) => (StatusCode::UNAUTHORIZED, ErrorBody::message(message)),
            WebError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody::message(message)),
            WebError::Conflict(message) => (StatusCode::CONFLICT, ErrorBody::message(message)),
            WebError::Upstream(e) => {
                tracing::error!("Recipe generation failed: {}", e);
                match e.kind() {
                    FailureKind::InvalidCredentials => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorBody::message("AI service configuration error - Invalid API key"),
                    ),
                    FailureKind::ModelUnavailable => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorBody::message(
                            "AI model not available. Please try again later or contact support.",
                        ),
                    ),
                    FailureKind::QuotaExceeded => (
                        StatusCode::TOO_MANY_REQUESTS,
                        ErrorBody {
                            retry_after: Some(QUOTA_RETRY_AFTER_SECS),
                            ..ErrorBody::message(
                                "AI service quota exceeded. Please try again in a few minutes.",
                            )
                        },
                    ),
                    FailureKind::Other => {
                        let mut body = ErrorBody::message("Failed to generate recipe");
                        body.error = Some(if cfg!(debug_assertions) {
                            e.to_string()
                        } else {
                            "Internal server error".into()
                        });
                        (StatusCode::INTERNAL_SERVER_ERROR, body)
                    }
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
