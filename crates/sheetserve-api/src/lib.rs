//! sheetserve HTTP and WebSocket server library
//!
//! Wires the session store, workbook processor, connection registry, and
//! per-session file watcher behind an axum router.

#![forbid(unsafe_code)]

pub mod handlers;
pub mod registry;
pub mod routes;
pub mod session;
pub mod state;

pub use registry::ConnectionRegistry;
pub use session::{SessionStore, StoredSession};
pub use state::AppState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use sheetserve_core::{Config, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Interval between session expiry sweeps
const PURGE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the API router with all routes and state
///
/// When `storage.session_ttl_secs` is non-zero, a background sweep removes
/// stored sessions older than the TTL.
///
/// # Errors
///
/// Returns an error if the application state cannot be created or validated.
pub fn build_router(config: Config) -> Result<Router> {
    let state = Arc::new(AppState::new(config.clone())?);
    state.validate()?;

    if config.storage.session_ttl_secs > 0 {
        let ttl = Duration::from_secs(config.storage.session_ttl_secs);
        let sessions = state.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let purged = sessions.purge_older_than(ttl);
                if purged > 0 {
                    info!(purged, "Session expiry sweep");
                }
            }
        });
    }

    // Leave headroom above the upload cap so oversized files reach the
    // validator and are rejected with a size reason instead of a generic 413
    let body_limit = usize::try_from(
        config
            .storage
            .max_file_size
            .saturating_mul(2)
            .saturating_add(64 * 1024),
    )
    .unwrap_or(usize::MAX);

    let app = routes::build_router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit));

    Ok(app)
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.base_dir = temp_dir.path().to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_build_router() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let router = build_router(test_config(&temp_dir));
        assert!(router.is_ok());
    }

    #[tokio::test]
    async fn test_build_router_creates_upload_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&temp_dir);
        let upload_dir = config.upload_dir();

        build_router(config).expect("Failed to build router");
        assert!(upload_dir.exists());
    }

    #[test]
    fn test_re_exports() {
        let _registry = ConnectionRegistry::new();
        let _state_type = std::any::type_name::<AppState>();
        let _store_type = std::any::type_name::<SessionStore>();
    }
}
