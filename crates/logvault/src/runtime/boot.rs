//! Boot — logging init, config load, Docker connection, state creation.

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::client::LogFeed;
use crate::conf::EngineConfig;
use crate::docker::client::DockerClient;
use crate::state::{EngineState, SharedState};

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; stdout is reserved for command output.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logvault=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config, connect to Docker and build shared state.
///
/// An unreachable daemon is not fatal: live views come back empty and
/// saved history keeps working.
pub async fn boot() -> Result<SharedState, Box<dyn std::error::Error>> {
    info!("Starting logvault v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load()?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!(
        data_dir = %config.data_dir,
        multiline = %config.multiline,
        timestamps = config.timestamps,
        "Loaded configuration"
    );

    info!(
        "Connecting to Docker daemon at: {}",
        if config.docker_socket.is_empty() {
            "default socket"
        } else {
            &config.docker_socket
        }
    );

    let docker_client = DockerClient::new(&config.docker_socket).map_err(|e| {
        error!("Failed to create Docker client: {}", e);
        e
    })?;

    match docker_client.ping().await {
        Ok(()) => info!("Successfully connected to Docker daemon"),
        Err(e) => warn!("Docker daemon not reachable, live views will be empty: {}", e),
    }

    let feed: Arc<dyn LogFeed> = Arc::new(docker_client);
    Ok(Arc::new(EngineState::new(feed, config)))
}
