//! # Costello Site
//!
//! HTTP server for the personal website backend.
//!
//! ## Environment Variables
//!
//! - `xapi_consumer_key`, `xapi_consumer_secret`, `xapi_access_token`,
//!   `xapi_access_token_secret`: Twitter API credentials for `POST /api/tweet`
//! - `API_TOKENS`: Comma-separated bearer tokens accepted by `POST /api/tweet`
//! - `PORT`: Server port (defaults to 3000)
//!
//! ## API Endpoints
//!
//! - `GET /health`: Returns service health status
//! - `GET /api/time`: Returns the current time
//! - `POST /api/tweet`: Posts a status to Twitter/X (requires an API token)
//! - `POST /tools/guid`, `/tools/hash`, `/tools/machinekey`: Developer tools

use costello_site::{create_app, get_server_port, AppState};
use log::info;
use std::net::SocketAddr;

/// Main entry point for the web service.
///
/// Initializes logging, builds the application state from the environment,
/// and serves requests until Ctrl+C is received.
///
/// # Logging
///
/// The application uses the `env_logger` crate for structured logging. Log levels
/// can be controlled via the `RUST_LOG` environment variable.
///
/// # Example Usage
///
/// ```bash
/// # Run with default port 3000
/// cargo run
///
/// # Run on custom port with debug logging
/// PORT=8080 RUST_LOG=debug cargo run
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logging system
    env_logger::init();

    let state = AppState::from_env();
    let app = create_app(state);

    // Get the server port and bind address
    let port = get_server_port();
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    info!("Starting costello-site server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
