use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::logs::LogService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Storage and history still work, but live views return nothing.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub version: String,
    pub docker_available: bool,
}

impl LogService {
    /// Liveness snapshot, including whether the log feed answers a ping.
    pub async fn health(&self) -> HealthReport {
        let docker_available = match self.state().feed.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Log feed ping failed");
                false
            }
        };

        HealthReport {
            status: evaluate_health(docker_available),
            timestamp: Utc::now(),
            uptime_secs: self.state().started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            docker_available,
        }
    }
}

fn evaluate_health(docker_available: bool) -> HealthStatus {
    if docker_available {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}
