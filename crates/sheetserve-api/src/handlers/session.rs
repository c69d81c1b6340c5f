//! Explicit session deletion handler

use super::error_response;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::error;

/// Delete a session's stored file
///
/// Any live push channel for the session stays registered; its watcher will
/// observe the removal and report it as a change event.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.remove(&session_id) {
        Ok(true) => Json(serde_json::json!({ "success": true })).into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "File not found").into_response(),
        Err(err) => {
            error!(session = %session_id, error = %err, "Failed to delete session");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error deleting session")
                .into_response()
        }
    }
}
