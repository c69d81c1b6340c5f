//! Cell update handler

use super::error_response;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use sheetserve_core::types::CellUpdate;
use sheetserve_workbook::Workbook;
use std::sync::Arc;
use tracing::{error, info};

/// Apply a cell update and persist the workbook in place
///
/// Each call is load -> mutate -> save against the stored file; nothing is
/// cached across requests and the later of two concurrent saves wins in
/// full. A mutation error leaves the stored file untouched.
pub async fn update_cell(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(update): Json<CellUpdate>,
) -> impl IntoResponse {
    let Some(stored_path) = state.sessions.resolve(&session_id) else {
        return error_response(StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let mut workbook = match Workbook::open(&stored_path) {
        Ok(workbook) => workbook,
        Err(err) => {
            error!(session = %session_id, error = %err, "Failed to load workbook");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error loading file")
                .into_response();
        }
    };

    if let Err(err) = workbook.update_cell(
        &update.sheet_name,
        update.row,
        update.col,
        &update.value,
        update.formula.as_deref(),
    ) {
        error!(session = %session_id, error = %err, "Cell update failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error updating cell")
            .into_response();
    }

    // A failed save leaves disk and memory inconsistent; it must surface
    if let Err(err) = workbook.save(&stored_path) {
        error!(session = %session_id, error = %err, "Failed to persist workbook");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error saving file")
            .into_response();
    }

    info!(
        session = %session_id,
        sheet = %update.sheet_name,
        row = update.row,
        col = update.col,
        "Cell updated"
    );

    Json(serde_json::json!({ "success": true })).into_response()
}
