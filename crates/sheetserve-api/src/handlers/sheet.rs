//! Sheet snapshot handler

use super::error_response;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use sheetserve_workbook::{Workbook, WorkbookError};
use std::sync::Arc;
use tracing::error;

/// Query parameters for sheet reads
#[derive(Debug, Deserialize)]
pub struct SheetQuery {
    /// Sheet to read; defaults to the first sheet
    pub sheet_name: Option<String>,
}

/// Return a fresh snapshot of one worksheet
pub async fn get_sheet(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<SheetQuery>,
) -> impl IntoResponse {
    let Some(stored_path) = state.sessions.resolve(&session_id) else {
        return error_response(StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let workbook = match Workbook::open(&stored_path) {
        Ok(workbook) => workbook,
        Err(err) => {
            error!(session = %session_id, error = %err, "Failed to load workbook");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error loading file")
                .into_response();
        }
    };

    match workbook.sheet_snapshot(query.sheet_name.as_deref()) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(WorkbookError::SheetNotFound { name }) => {
            error_response(StatusCode::NOT_FOUND, format!("Sheet not found: {name}"))
                .into_response()
        }
        Err(err) => {
            error!(session = %session_id, error = %err, "Failed to read sheet");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error reading sheet")
                .into_response()
        }
    }
}
