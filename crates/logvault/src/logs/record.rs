//! Record building: frame payload → timestamped, classified log entries.
//!
//! With timestamps requested, Docker prefixes the first line of a payload
//! with an RFC3339Nano timestamp and a single space:
//! `"2023-01-01T00:00:00.000000000Z message content..."`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::level::classify;
use super::model::{LogEntry, StreamKind};
use crate::docker::frame::Frame;

/// How a payload containing embedded newlines becomes records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultilinePolicy {
    /// Every non-empty line is its own record. A line with its own timestamp
    /// prefix keeps it; other lines inherit the timestamp of the first line.
    #[default]
    Split,
    /// The whole payload is one record; embedded newlines stay in the message.
    Join,
}

impl FromStr for MultilinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(MultilinePolicy::Split),
            "join" => Ok(MultilinePolicy::Join),
            other => Err(format!("unknown multiline policy: {}", other)),
        }
    }
}

impl fmt::Display for MultilinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MultilinePolicy::Split => "split",
            MultilinePolicy::Join => "join",
        })
    }
}

/// Split a leading RFC3339 timestamp off `line`.
///
/// Returns `None` when the text before the first space does not parse.
pub fn split_timestamp(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let (head, rest) = match line.split_once(' ') {
        Some(parts) => parts,
        None => (line, ""),
    };
    let ts = DateTime::parse_from_rfc3339(head).ok()?;
    Some((ts.with_timezone(&Utc), rest))
}

/// Turns frames from one source segment into [`LogEntry`] records.
///
/// Keep one builder per feed: it remembers the last timestamp so that
/// synthetic (wall-clock) timestamps never run backwards within the segment.
#[derive(Debug)]
pub struct RecordBuilder {
    timestamps: bool,
    policy: MultilinePolicy,
    last_timestamp: Option<DateTime<Utc>>,
    synthetic: u64,
}

impl RecordBuilder {
    /// `timestamps` is the out-of-band flag saying whether the feed was
    /// opened with per-line timestamps.
    pub fn new(timestamps: bool, policy: MultilinePolicy) -> Self {
        Self {
            timestamps,
            policy,
            last_timestamp: None,
            synthetic: 0,
        }
    }

    /// Number of records that were given a processing-time timestamp.
    pub fn synthetic_count(&self) -> u64 {
        self.synthetic
    }

    pub fn build(&mut self, frame: &Frame) -> Vec<LogEntry> {
        self.build_at(frame, Utc::now())
    }

    /// As [`build`](Self::build), with an explicit processing time.
    pub fn build_at(&mut self, frame: &Frame, now: DateTime<Utc>) -> Vec<LogEntry> {
        let text = String::from_utf8_lossy(&frame.payload);

        let (first_line, rest) = match text.split_once('\n') {
            Some((first, rest)) => (first, Some(rest)),
            None => (text.as_ref(), None),
        };
        let (frame_ts, first_message) = self.resolve(first_line, now);

        let mut records = Vec::new();
        match self.policy {
            MultilinePolicy::Join => {
                let mut message = first_message.to_string();
                if let Some(rest) = rest {
                    message.push('\n');
                    message.push_str(rest);
                }
                push_record(&mut records, frame_ts, &message, frame.stream);
            }
            MultilinePolicy::Split => {
                push_record(&mut records, frame_ts, first_message, frame.stream);
                for line in rest.into_iter().flat_map(|r| r.split('\n')) {
                    let (ts, message) = match self.timestamps.then(|| split_timestamp(line)).flatten() {
                        Some((ts, message)) => (ts, message),
                        None => (frame_ts, line),
                    };
                    push_record(&mut records, ts, message, frame.stream);
                }
            }
        }

        if let Some(last) = records.last() {
            self.last_timestamp = Some(last.timestamp);
        }
        records
    }

    /// Timestamp and message body for the first line of a payload.
    fn resolve<'a>(&mut self, line: &'a str, now: DateTime<Utc>) -> (DateTime<Utc>, &'a str) {
        if self.timestamps {
            if let Some(parsed) = split_timestamp(line) {
                return parsed;
            }
        }

        self.synthetic += 1;
        debug!(
            timestamps_requested = self.timestamps,
            "No timestamp prefix, using processing time (synthetic timestamp)"
        );
        let ts = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        (ts, line)
    }
}

fn push_record(records: &mut Vec<LogEntry>, timestamp: DateTime<Utc>, message: &str, stream: StreamKind) {
    let message = message.trim_end();
    if message.trim().is_empty() {
        return;
    }
    records.push(LogEntry {
        timestamp,
        message: message.to_string(),
        stream,
        level: classify(message),
    });
}
