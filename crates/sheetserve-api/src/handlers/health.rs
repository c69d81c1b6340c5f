//! Health check handlers

use crate::state::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Current server time
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Service version
    pub version: String,
    /// Number of live push channels
    pub connections: usize,
}

/// Basic health check
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.registry.len(),
    })
}
