use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio_stream::StreamExt;

use logvault::docker::client::DockerError;
use logvault::docker::stream::ChunkStream;
use logvault::export::ExportKind;
use logvault::filter::condition::FilterCondition;
use logvault::filter::query::{LevelFilter, StreamFilter, TimeWindow};
use logvault::logs::model::RawLogEntry;
use logvault::runtime::boot;
use logvault::service::{HistoryQuery, LiveQuery, LogService};

const DECODE_CHUNK_BYTES: usize = 64 * 1024;

/// logvault - capture, classify and keep container logs
#[derive(Parser, Debug)]
#[command(name = "logvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the last lines of a container's logs
    Tail {
        container: String,
        /// Level filter (all, error, warn, info, debug)
        #[arg(long, default_value = "all")]
        level: LevelFilter,
        /// Stream filter (all, stdout, stderr)
        #[arg(long, default_value = "all")]
        stream: StreamFilter,
        /// Relative window (all, 5m, 1h, 24h)
        #[arg(long, default_value = "all")]
        window: TimeWindow,
        /// Case-insensitive substring search on the message
        #[arg(long, default_value = "")]
        search: String,
        /// Structured condition as type:operator:value (repeatable)
        #[arg(long = "condition", value_parser = parse_condition)]
        conditions: Vec<FilterCondition>,
    },

    /// Stream a container's logs until interrupted
    Follow { container: String },

    /// Save log entries (a JSON array read from a file or stdin)
    Save {
        container: String,
        /// Container display name
        #[arg(long)]
        name: String,
        /// JSON file with entries; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Search saved logs, newest first
    History {
        #[arg(long)]
        container: Option<String>,
        /// RFC3339 lower bound (inclusive)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// RFC3339 upper bound (inclusive)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long, default_value = "all")]
        level: LevelFilter,
        /// Matches message or container name
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long = "condition", value_parser = parse_condition)]
        conditions: Vec<FilterCondition>,
    },

    /// Export saved logs, oldest first
    Export {
        #[arg(long)]
        container: Option<String>,
        /// json, csv or text
        #[arg(long, default_value = "json")]
        format: ExportKind,
        /// Directory to write the export file into; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Decode a captured multiplexed log dump
    Decode { file: PathBuf },

    /// Report engine health
    Health,
}

fn parse_condition(raw: &str) -> Result<FilterCondition, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(kind), Some(operator), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected type:operator:value, got {:?}", raw));
    };
    let kind = serde_json::from_value(serde_json::Value::String(kind.to_string()))
        .map_err(|_| format!("unknown condition type: {}", kind))?;
    let operator = serde_json::from_value(serde_json::Value::String(operator.to_string()))
        .map_err(|_| format!("unknown condition operator: {}", operator))?;
    Ok(FilterCondition::new(kind, operator, value))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_input(input: Option<PathBuf>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        return Ok(tokio::fs::read(path).await?);
    }
    let mut data = Vec::new();
    tokio::io::stdin().read_to_end(&mut data).await?;
    Ok(data)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    boot::init_logging();
    let state = boot::boot().await?;
    let service = LogService::new(state);

    match cli.command {
        Commands::Tail { container, level, stream, window, search, conditions } => {
            let live = LiveQuery { level, stream, window, search, conditions };
            print_json(&service.live_logs(&container, &live).await)?;
        }
        Commands::Follow { container } => {
            let mut entries = service.follow(&container);
            loop {
                tokio::select! {
                    entry = entries.next() => match entry {
                        Some(entry) => println!("{}", serde_json::to_string(&entry)?),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        Commands::Save { container, name, input } => {
            let raw: Vec<RawLogEntry> = serde_json::from_slice(&read_input(input).await?)?;
            print_json(&service.save_raw(&container, &name, raw).await)?;
        }
        Commands::History { container, start, end, level, search, conditions } => {
            let history = HistoryQuery { container_id: container, start, end, level, search, conditions };
            print_json(&service.search(&history).await)?;
        }
        Commands::Export { container, format, output } => {
            let payload = service.export(container.as_deref(), format).await;
            match output {
                Some(dir) => {
                    let path = dir.join(&payload.filename);
                    tokio::fs::write(&path, &payload.body).await?;
                    eprintln!("Wrote {} ({})", path.display(), payload.content_type);
                }
                None => println!("{}", String::from_utf8_lossy(&payload.body)),
            }
        }
        Commands::Decode { file } => {
            let data = Bytes::from(tokio::fs::read(&file).await?);
            let chunks: Vec<Result<Bytes, DockerError>> = (0..data.len())
                .step_by(DECODE_CHUNK_BYTES)
                .map(|start| Ok(data.slice(start..(start + DECODE_CHUNK_BYTES).min(data.len()))))
                .collect();
            let chunks: ChunkStream = Box::pin(tokio_stream::iter(chunks));
            let source = file.display().to_string();
            print_json(&service.decode(&source, chunks).await)?;
        }
        Commands::Health => print_json(&service.health().await)?,
    }

    Ok(())
}
