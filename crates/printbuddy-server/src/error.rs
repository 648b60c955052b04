use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::intake::IntakeError;

pub const SERVER_ERROR: &str = "Server error";
pub const UPLOAD_FAILED: &str = "File upload failed";
pub const RATE_LIMITED: &str = "Too many requests, please try again later.";

/// Everything a handler can answer with besides success. Rendered as
/// `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{}", RATE_LIMITED)]
    RateLimited,

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::Validation(e) => ApiError::BadRequest(e.message().to_string()),
            IntakeError::Stage(e) if e.is_client_error() => ApiError::BadRequest(e.to_string()),
            IntakeError::Stage(_) => ApiError::Internal(UPLOAD_FAILED),
            IntakeError::Persist(_) => ApiError::Internal(SERVER_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}
