//! Main entry point for the sheetserve server

use sheetserve_api::build_router;
use sheetserve_core::{Config, init_logging};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> sheetserve_core::Result<()> {
    // Load .env file if it exists (for development convenience)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: .env file not loaded: {e}");
    }

    init_logging()?;

    let config = Config::load().unwrap_or_else(|err| {
        info!("Failed to load config ({err}), using defaults");
        Config::default()
    });

    info!(
        "Starting sheetserve v{} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port
    );
    info!(
        upload_dir = %config.upload_dir().display(),
        max_file_size = config.storage.max_file_size,
        session_ttl_secs = config.storage.session_ttl_secs,
        "Storage configuration"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sheetserve_core::Error::Configuration {
            message: format!("Invalid server address: {e}"),
        })?;

    let app = build_router(config)?
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(sheetserve_core::Error::Io)?;

    Ok(())
}
