//! API route definitions

use crate::{handlers, state::AppState};
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

/// Build the session and document routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(handlers::upload::upload_workbook))
        .route("/sheet/:session_id", get(handlers::sheet::get_sheet))
        .route("/update/:session_id", post(handlers::update::update_cell))
        .route("/analyze/:session_id", get(handlers::analyze::analyze_sheet))
        .route(
            "/download/:session_id",
            get(handlers::download::download_workbook),
        )
        .route(
            "/session/:session_id",
            delete(handlers::session::delete_session),
        )
        .route("/ws/:session_id", get(handlers::ws::websocket_handler))
        .layer(CompressionLayer::new())
}

/// Build health check routes
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/", get(root_endpoint))
}

/// Combine all routes into a single router
pub fn build_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(api_routes())
        .merge(health_routes())
        .fallback(not_found_handler)
}

/// Handle 404 Not Found errors
async fn not_found_handler() -> (axum::http::StatusCode, axum::Json<serde_json::Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({
            "error": "Not Found",
            "message": "The requested endpoint does not exist"
        })),
    )
}

/// Root endpoint for basic connectivity
async fn root_endpoint() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "service": "sheetserve",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "endpoints": {
            "upload": "/upload",
            "sheet": "/sheet/{session_id}",
            "update": "/update/{session_id}",
            "analyze": "/analyze/{session_id}",
            "download": "/download/{session_id}",
            "push": "/ws/{session_id}"
        }
    }))
}
