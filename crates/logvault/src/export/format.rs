//! Export — render stored records as a downloadable payload.
//!
//! Rows are written in the order given; the query engine's export view
//! already sorts them oldest first.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use chrono::{NaiveDate, SecondsFormat};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use crate::logs::model::PersistedLogEntry;

pub const CSV_HEADER: &str = "Timestamp,Container,Level,Stream,Message";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Export buffer error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportKind {
    #[default]
    Json,
    Csv,
    Text,
}

impl ExportKind {
    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::Json => "json",
            ExportKind::Csv => "csv",
            ExportKind::Text => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportKind::Json => "application/json",
            ExportKind::Csv => "text/csv",
            ExportKind::Text => "text/plain",
        }
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportKind::Json),
            "csv" => Ok(ExportKind::Csv),
            "text" | "txt" => Ok(ExportKind::Text),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub body: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

impl ExportPayload {
    /// A well-formed payload with no rows: `[]`, the bare CSV header, or no text.
    pub fn empty(kind: ExportKind, container_id: Option<&str>, today: NaiveDate) -> Self {
        let body = match kind {
            ExportKind::Json => b"[]".to_vec(),
            ExportKind::Csv => format!("{}\n", CSV_HEADER).into_bytes(),
            ExportKind::Text => Vec::new(),
        };
        Self {
            body,
            filename: export_filename(container_id, today, kind),
            content_type: kind.content_type(),
        }
    }
}

/// `logs-{containerId or "all"}-{YYYY-MM-DD}.{ext}`
pub fn export_filename(container_id: Option<&str>, date: NaiveDate, kind: ExportKind) -> String {
    format!(
        "logs-{}-{}.{}",
        container_id.unwrap_or("all"),
        date.format("%Y-%m-%d"),
        kind.extension()
    )
}

pub fn format(
    entries: &[PersistedLogEntry],
    kind: ExportKind,
    container_id: Option<&str>,
    today: NaiveDate,
) -> Result<ExportPayload, ExportError> {
    let body = match kind {
        ExportKind::Json => serde_json::to_vec_pretty(entries)?,
        ExportKind::Csv => render_csv(entries)?,
        ExportKind::Text => render_text(entries)?,
    };

    Ok(ExportPayload {
        body,
        filename: export_filename(container_id, today, kind),
        content_type: kind.content_type(),
    })
}

/// Header line bare, every data field quoted with `"` doubled inside.
fn render_csv(entries: &[PersistedLogEntry]) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::with_capacity(64 * (entries.len() + 1));
    out.extend_from_slice(CSV_HEADER.as_bytes());
    out.push(b'\n');

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    for record in entries {
        let timestamp = record.entry.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        writer.write_record([
            timestamp.as_str(),
            record.container_name.as_str(),
            record.entry.level.as_str(),
            record.entry.stream.as_str(),
            record.entry.message.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(io::Error::other(e.to_string())))
}

fn render_text(entries: &[PersistedLogEntry]) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    for record in entries {
        writeln!(
            out,
            "[{}] [{}] [{}] {}",
            record.entry.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            record.entry.stream.as_str().to_ascii_uppercase(),
            record.entry.level.as_str().to_ascii_uppercase(),
            record.entry.message
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::model::{Level, LogEntry, StreamKind};

    fn record(minute: u32, message: &str, level: Level, stream: StreamKind) -> PersistedLogEntry {
        PersistedLogEntry {
            id: format!("c1-{}", minute),
            container_id: "c1".to_string(),
            container_name: "web".to_string(),
            entry: LogEntry {
                timestamp: format!("2024-03-01T10:{:02}:00Z", minute).parse().unwrap(),
                message: message.to_string(),
                stream,
                level,
            },
            saved_at: "2024-03-01T12:00:00Z".parse().unwrap(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
    }

    #[test]
    fn test_filename_convention() {
        assert_eq!(export_filename(Some("c1"), today(), ExportKind::Csv), "logs-c1-2024-03-02.csv");
        assert_eq!(export_filename(None, today(), ExportKind::Json), "logs-all-2024-03-02.json");
        assert_eq!(export_filename(None, today(), ExportKind::Text), "logs-all-2024-03-02.txt");
    }

    #[test]
    fn test_csv_layout() {
        let entries = vec![
            record(1, "boot", Level::Info, StreamKind::Stdout),
            record(2, "disk error", Level::Error, StreamKind::Stderr),
        ];
        let payload = format(&entries, ExportKind::Csv, Some("c1"), today()).unwrap();
        let text = String::from_utf8(payload.body).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(payload.content_type, "text/csv");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], r#""2024-03-01T10:01:00Z","web","info","stdout","boot""#);
        assert_eq!(lines[2], r#""2024-03-01T10:02:00Z","web","error","stderr","disk error""#);
    }

    #[test]
    fn test_csv_escapes_quotes_and_reparses() {
        let entries = vec![record(1, r#"He said "hi""#, Level::Info, StreamKind::Stdout)];
        let payload = format(&entries, ExportKind::Csv, None, today()).unwrap();
        let text = String::from_utf8(payload.body.clone()).unwrap();
        assert!(text.contains(r#""He said ""hi""""#));

        let mut reader = csv::Reader::from_reader(payload.body.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(4), Some("Message"));
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(4), Some(r#"He said "hi""#));
    }

    #[test]
    fn test_csv_keeps_commas_and_newlines_in_one_field() {
        let entries = vec![record(1, "a, b\nc", Level::Info, StreamKind::Stdout)];
        let payload = format(&entries, ExportKind::Csv, None, today()).unwrap();
        let mut reader = csv::Reader::from_reader(payload.body.as_slice());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(row.len(), 5);
        assert_eq!(row.get(4), Some("a, b\nc"));
    }

    #[test]
    fn test_json_is_the_array_unchanged() {
        let entries = vec![record(1, "one", Level::Info, StreamKind::Stdout)];
        let payload = format(&entries, ExportKind::Json, Some("c1"), today()).unwrap();
        assert_eq!(payload.content_type, "application/json");

        let back: Vec<PersistedLogEntry> = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(back, entries);
    }

    #[test]
    fn test_empty_csv_is_header_only() {
        let payload = format(&[], ExportKind::Csv, None, today()).unwrap();
        assert_eq!(String::from_utf8(payload.body).unwrap(), format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn test_empty_payload_matches_rendered_empty_export() {
        for kind in [ExportKind::Json, ExportKind::Csv, ExportKind::Text] {
            let empty = ExportPayload::empty(kind, Some("c1"), today());
            let rendered = format(&[], kind, Some("c1"), today()).unwrap();
            assert_eq!(empty.filename, rendered.filename);
            assert_eq!(empty.content_type, rendered.content_type);
            if kind == ExportKind::Json {
                let back: Vec<PersistedLogEntry> = serde_json::from_slice(&empty.body).unwrap();
                assert!(back.is_empty());
            } else {
                assert_eq!(empty.body, rendered.body);
            }
        }
    }

    #[test]
    fn test_text_lines() {
        let entries = vec![record(5, "oops", Level::Warn, StreamKind::Stderr)];
        let payload = format(&entries, ExportKind::Text, None, today()).unwrap();
        assert_eq!(
            String::from_utf8(payload.body).unwrap(),
            "[2024-03-01T10:05:00Z] [STDERR] [WARN] oops\n"
        );
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("CSV".parse::<ExportKind>(), Ok(ExportKind::Csv));
        assert_eq!("txt".parse::<ExportKind>(), Ok(ExportKind::Text));
        assert!("xml".parse::<ExportKind>().is_err());
    }
}
