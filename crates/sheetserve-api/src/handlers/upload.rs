//! Workbook upload handler

use super::error_response;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use sheetserve_core::Error;
use sheetserve_workbook::Workbook;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Response for a successful upload
#[derive(serde::Serialize, serde::Deserialize)]
pub struct UploadResponse {
    /// Opaque session identifier for subsequent operations
    pub session_id: String,
    /// Sanitized original filename
    pub filename: String,
    /// Stored file path
    pub file_path: String,
    /// Names of all sheets in the uploaded workbook
    pub sheets: Vec<String>,
}

/// Handle a multipart workbook upload
///
/// The `file` field carries the workbook bytes. The upload passes the
/// security validator and must load as a workbook before a session is
/// returned; a rejected upload is never left on disk.
pub async fn upload_workbook(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    // Ignore unknown fields for compatibility
                    continue;
                }
                original_name = field.file_name().map(String::from);
                match field.bytes().await {
                    Ok(data) => file_bytes = Some(data.to_vec()),
                    Err(e) => {
                        error!("Failed to read uploaded file data: {e}");
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            "Failed to read uploaded file data",
                        )
                        .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Error parsing multipart data: {e}");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid multipart data: {e}"),
                )
                .into_response();
            }
        }
    }

    let Some(bytes) = file_bytes else {
        return error_response(StatusCode::BAD_REQUEST, "No file provided").into_response();
    };
    let Some(name) = original_name else {
        return error_response(StatusCode::BAD_REQUEST, "Filename is required").into_response();
    };

    let session = match state.sessions.create(&bytes, &name) {
        Ok(session) => session,
        Err(err) => {
            let status = match err {
                Error::Validation { .. } | Error::FileSizeExceeded { .. } => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!(file = %name, error = %err, "Upload rejected");
            return error_response(status, err.to_string()).into_response();
        }
    };

    // The security gate accepts well-formed containers; the workbook parser
    // has the final say on whether the content is actually a spreadsheet.
    let workbook = match Workbook::open(&session.path) {
        Ok(workbook) => workbook,
        Err(err) => {
            error!(file = %session.stored_name, error = %err, "Uploaded file is not a loadable workbook");
            if let Err(cleanup) = std::fs::remove_file(&session.path) {
                warn!(path = %session.path.display(), error = %cleanup, "Failed to remove invalid upload");
            }
            return error_response(StatusCode::BAD_REQUEST, "Invalid workbook file")
                .into_response();
        }
    };

    let sheets = workbook.sheet_names();
    info!(
        session = %session.token,
        file = %session.stored_name,
        sheets = sheets.len(),
        "Upload accepted"
    );

    (
        StatusCode::OK,
        Json(UploadResponse {
            session_id: session.token,
            filename: sheetserve_core::utils::sanitize_filename(&name),
            file_path: session.path.display().to_string(),
            sheets,
        }),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upload_response_serialization() {
        let response = UploadResponse {
            session_id: "1e8e7cb3-9f5d-4a70-a5b3-0a5d9c3a5b1e".to_string(),
            filename: "report.xlsx".to_string(),
            file_path: "/data/uploads/1e8e7cb3_report.xlsx".to_string(),
            sheets: vec!["Sheet1".to_string(), "Summary".to_string()],
        };

        let json = serde_json::to_string(&response).expect("Failed to serialize");
        assert!(json.contains("\"session_id\""));
        assert!(json.contains("report.xlsx"));
        assert!(json.contains("Summary"));
    }

    #[test]
    fn test_upload_response_roundtrip() {
        let original = UploadResponse {
            session_id: "abc".to_string(),
            filename: "a.xlsx".to_string(),
            file_path: "/tmp/abc_a.xlsx".to_string(),
            sheets: vec!["Sheet1".to_string()],
        };

        let json = serde_json::to_string(&original).expect("Failed to serialize");
        let back: UploadResponse = serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(back.session_id, original.session_id);
        assert_eq!(back.filename, original.filename);
        assert_eq!(back.sheets, original.sheets);
    }
}
