//! Keel project service binary.
//!
//! Loads `keel-config.yaml` (or defaults), initializes tracing, and serves
//! the remote project API until `Ctrl-C`.

use std::path::Path;
use std::sync::Arc;

use keel_persistence::KeelConfig;
use keel_persistence::config::CONFIG_FILE_NAME;
use keel_server::{AppState, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Keel project service starting");

    // 2. Load configuration
    let config = KeelConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3. Serve
    let state = Arc::new(AppState::new());
    start_server(&config.server, state).await?;

    Ok(())
}
