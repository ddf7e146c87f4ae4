//! Model — log records as they flow from the feed to storage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which container output a record was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    /// Map a multiplexed frame's origin byte to a stream.
    /// Anything other than `1` or `2` (stdin echo, system errors) is not log data.
    pub fn from_origin(origin: u8) -> Option<Self> {
        match origin {
            1 => Some(StreamKind::Stdout),
            2 => Some(StreamKind::Stderr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(StreamKind::Stdout),
            "stderr" => Ok(StreamKind::Stderr),
            other => Err(format!("unknown stream: {}", other)),
        }
    }
}

/// Severity assigned by the level classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Debug,
    Info,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Debug => "debug",
            Level::Info => "info",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            other => Err(format!("unknown level: {}", other)),
        }
    }
}

/// A classified log record. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub stream: StreamKind,
    pub level: Level,
}

/// A record as handed to the live view or the save surface by a caller:
/// level and stream may be missing and are filled in on classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub stream: Option<StreamKind>,
    #[serde(default)]
    pub level: Option<Level>,
}

/// A record committed to the store by an explicit save.
///
/// On disk the [`LogEntry`] fields are flattened next to the storage
/// metadata, giving one flat camelCase JSON object per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLogEntry {
    pub id: String,
    pub container_id: String,
    pub container_name: String,
    #[serde(flatten)]
    pub entry: LogEntry,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_from_origin() {
        assert_eq!(StreamKind::from_origin(1), Some(StreamKind::Stdout));
        assert_eq!(StreamKind::from_origin(2), Some(StreamKind::Stderr));
        assert_eq!(StreamKind::from_origin(0), None);
        assert_eq!(StreamKind::from_origin(3), None);
    }

    #[test]
    fn test_level_parse_is_case_insensitive() {
        assert_eq!("ERROR".parse::<Level>(), Ok(Level::Error));
        assert_eq!("Warning".parse::<Level>(), Ok(Level::Warn));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_persisted_entry_is_flat_camel_case() {
        let entry = PersistedLogEntry {
            id: "c1-1-abc".to_string(),
            container_id: "c1".to_string(),
            container_name: "web".to_string(),
            entry: LogEntry {
                timestamp: "2024-03-01T10:00:00Z".parse().unwrap(),
                message: "hello".to_string(),
                stream: StreamKind::Stderr,
                level: Level::Info,
            },
            saved_at: "2024-03-01T10:05:00Z".parse().unwrap(),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["containerId"], "c1");
        assert_eq!(json["containerName"], "web");
        assert_eq!(json["stream"], "stderr");
        assert_eq!(json["level"], "info");
        assert!(json.get("entry").is_none());
        assert!(json.get("savedAt").is_some());

        let back: PersistedLogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_raw_entry_accepts_missing_level_and_stream() {
        let raw: RawLogEntry =
            serde_json::from_str(r#"{"timestamp":"2024-03-01T10:00:00Z","message":"x"}"#).unwrap();
        assert!(raw.stream.is_none());
        assert!(raw.level.is_none());
    }
}
