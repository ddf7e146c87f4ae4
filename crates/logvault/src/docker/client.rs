//! Docker client — core struct, constructor, error types.
//!
//! Log feed methods live in `container`, which adds an `impl DockerClient` block.

use bollard::Docker;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Docker daemon unavailable")]
    Unavailable,
    #[error("Stream closed")]
    StreamClosed,
    #[error("Bollard error: {0}")]
    BollardError(#[from] bollard::errors::Error),
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    /// The bollard Docker client. `pub(super)` so that `container` can call
    /// bollard APIs directly.
    pub(super) client: Docker,
    /// The Docker host this client is connected to (empty = bollard defaults).
    pub(super) host: String,
}

impl DockerClient {
    /// Connect to the daemon at `host`.
    ///
    /// Accepts `unix:///path`, a bare socket path, `tcp://host:port` or
    /// `http://host:port`; an empty string uses bollard's defaults
    /// (`DOCKER_HOST`, then the platform socket).
    pub fn new(host: &str) -> Result<Self, DockerError> {
        let connection = if host.is_empty() {
            Docker::connect_with_defaults()
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            let addr = host.replacen("tcp://", "http://", 1);
            Docker::connect_with_http(&addr, 120, &bollard::API_DEFAULT_VERSION)
        } else {
            let clean_path = host.trim_start_matches("unix://");
            Docker::connect_with_socket(clean_path, 120, &bollard::API_DEFAULT_VERSION)
        }
        .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?;

        Ok(DockerClient {
            client: connection,
            host: host.to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check that the daemon answers.
    pub async fn ping(&self) -> Result<(), DockerError> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::debug!(host = %self.host, error = %e, "Docker ping failed");
                DockerError::Unavailable
            })
    }
}
