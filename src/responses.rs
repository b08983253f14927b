use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::organization::FieldError;

/// Error envelope shared by every failing endpoint: a short machine-stable
/// `error` label, a human-readable `message`, and optional per-field
/// `details` for validation failures. Serialize-only: the server writes
/// this shape, it never reads one back.
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    fn respond(status: StatusCode, error: &str, message: &str) -> Response {
        (
            status,
            Json(ApiError {
                error: error.to_string(),
                message: message.to_string(),
                details: None,
            }),
        )
            .into_response()
    }

    pub fn bad_request(message: &str) -> Response {
        Self::respond(StatusCode::BAD_REQUEST, "Bad Request", message)
    }

    pub fn validation(message: &str, details: Vec<FieldError>) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "Validation Error".to_string(),
                message: message.to_string(),
                details: Some(details),
            }),
        )
            .into_response()
    }

    pub fn unauthorized(message: &str) -> Response {
        Self::respond(StatusCode::UNAUTHORIZED, "Unauthorized", message)
    }

    pub fn forbidden(message: &str) -> Response {
        Self::respond(StatusCode::FORBIDDEN, "Forbidden", message)
    }

    pub fn not_found(message: &str) -> Response {
        Self::respond(StatusCode::NOT_FOUND, "Not Found", message)
    }

    pub fn conflict(message: &str) -> Response {
        Self::respond(StatusCode::CONFLICT, "Conflict", message)
    }

    pub fn too_many_requests(message: &str) -> Response {
        Self::respond(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests", message)
    }

    pub fn server_error() -> Response {
        Self::respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "An unexpected error occurred",
        )
    }
}
