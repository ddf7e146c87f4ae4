//! Model — EngineConfig.

use serde::{Deserialize, Serialize};

use crate::docker::frame::DEFAULT_MAX_FRAME_BYTES;
use crate::logs::record::MultilinePolicy;

pub const DEFAULT_CONFIG_FILE: &str = "/etc/logvault/logvault.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding one JSON unit per container per day.
    pub data_dir: String,
    /// Empty means bollard's defaults (`DOCKER_HOST` or the local socket).
    pub docker_socket: String,
    /// Ask the daemon for per-line timestamps.
    pub timestamps: bool,
    /// Records fetched by a non-follow live view.
    pub tail_lines: u32,
    /// Frame headers declaring more than this are treated as corrupt.
    pub max_frame_bytes: usize,
    pub multiline: MultilinePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/logs".to_string(),
            docker_socket: "".to_string(),
            timestamps: true,
            tail_lines: 100,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            multiline: MultilinePolicy::Split,
        }
    }
}
