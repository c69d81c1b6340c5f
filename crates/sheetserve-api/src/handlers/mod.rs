//! HTTP and WebSocket request handlers

pub mod analyze;
pub mod download;
pub mod health;
pub mod session;
pub mod sheet;
pub mod update;
pub mod upload;
pub mod ws;

use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

/// Response for request errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Error message describing what went wrong
    pub error: String,
}

/// Build an error response with the given status and message
pub(crate) fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
        }),
    )
}
