use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;

use crate::{render::RenderError, snowflake::IdError};

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// No identifier could be allocated for the request
    IdGeneration(IdError),
    /// View rendering failed
    Render(RenderError),
    /// Malformed request
    BadRequest(String),
    /// Request body over the configured limit
    PayloadTooLarge(String),
    /// Internal server error
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdGeneration(err) => write!(f, "Request id unavailable: {}", err),
            Self::Render(err) => write!(f, "Render error: {}", err),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IdGeneration(err) => Some(err),
            Self::Render(err) => Some(err),
            _ => None,
        }
    }
}

impl AppError {
    /// HTTP status and client-facing message
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::IdGeneration(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Request identifier unavailable".to_string(),
            ),
            Self::Render(RenderError::NotFound(view)) => {
                (StatusCode::NOT_FOUND, format!("View not found: {}", view))
            }
            // Details of template failures stay in the logs
            Self::Render(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to render view".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            Self::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_message().0
    }

    /// JSON error document sent to the client
    pub fn body(&self) -> Value {
        let (_, message) = self.status_and_message();
        json!({
            "error": {
                "message": message,
                "type": error_type_name(self),
            }
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::IdGeneration(_) => "id_generation_error",
        AppError::Render(RenderError::NotFound(_)) => "view_not_found",
        AppError::Render(_) => "render_error",
        AppError::BadRequest(_) => "bad_request",
        AppError::PayloadTooLarge(_) => "payload_too_large",
        AppError::InternalError(_) => "internal_error",
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        Self::IdGeneration(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}
