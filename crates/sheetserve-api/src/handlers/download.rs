//! Stored workbook download handler

use super::error_response;
use crate::session::SessionStore;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

/// Content type for xlsx downloads
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Return the stored file with the original filename restored
pub async fn download_workbook(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(stored_path) = state.sessions.resolve(&session_id) else {
        return error_response(StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let bytes = match tokio::fs::read(&stored_path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(session = %session_id, error = %err, "Failed to read stored file");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error reading file")
                .into_response();
        }
    };

    let filename = SessionStore::original_name(&stored_path);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
