//! Tabular analysis handler

use super::error_response;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use sheetserve_workbook::WorkbookError;
use std::sync::Arc;
use tracing::error;

/// Query parameters for analysis
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    /// Sheet to analyze; defaults to the first sheet
    pub sheet_name: Option<String>,
}

/// Analyze one worksheet through a columnar lens
///
/// Re-reads the stored file independently of any snapshot or pending edit.
pub async fn analyze_sheet(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> impl IntoResponse {
    let Some(stored_path) = state.sessions.resolve(&session_id) else {
        return error_response(StatusCode::NOT_FOUND, "File not found").into_response();
    };

    match sheetserve_workbook::analyze(&stored_path, query.sheet_name.as_deref()) {
        Ok(analysis) => Json(analysis).into_response(),
        Err(WorkbookError::SheetNotFound { name }) => {
            error_response(StatusCode::NOT_FOUND, format!("Sheet not found: {name}"))
                .into_response()
        }
        Err(err) => {
            error!(session = %session_id, error = %err, "Analysis failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error analyzing file")
                .into_response()
        }
    }
}
