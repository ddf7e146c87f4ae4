use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::docker::stream::{ChunkStream, DemuxStream, FeedRequest, FrameStream};
use crate::export::{self, ExportKind, ExportPayload};
use crate::filter::condition::FilterCondition;
use crate::filter::engine::FilterError;
use crate::filter::query::{LevelFilter, Query, QueryEngine, QueryView, StreamFilter, TimeRange, TimeWindow};
use crate::logs::level::classify;
use crate::logs::model::{LogEntry, PersistedLogEntry, RawLogEntry, StreamKind};
use crate::logs::record::RecordBuilder;
use crate::state::SharedState;

pub type EntryStream = Pin<Box<dyn Stream<Item = LogEntry> + Send>>;

/// Filters for the live (tail) view.
#[derive(Debug, Clone, Default)]
pub struct LiveQuery {
    pub level: LevelFilter,
    pub stream: StreamFilter,
    pub window: TimeWindow,
    pub search: String,
    pub conditions: Vec<FilterCondition>,
}

impl LiveQuery {
    pub fn to_query(&self, now: DateTime<Utc>) -> Result<Query, FilterError> {
        Query::new()
            .with_time_range(self.window.to_range(now))
            .with_level(self.level)
            .with_stream(self.stream)
            .with_raw_conditions(&self.conditions)
            .with_search(&self.search)
    }
}

/// Filters for the history view over saved records.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub container_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub level: LevelFilter,
    pub search: String,
    pub conditions: Vec<FilterCondition>,
}

impl HistoryQuery {
    pub fn to_query(&self) -> Result<Query, FilterError> {
        let mut query = Query::new()
            .with_time_range(TimeRange::new(self.start, self.end))
            .with_level(self.level)
            .with_raw_conditions(&self.conditions)
            .with_search(&self.search)?;
        query.container_id = self.container_id.clone();
        Ok(query)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub saved_count: usize,
    pub total_count: usize,
}

/// Entry point for every log surface: live view, save, history, export.
///
/// Transport and storage failures stop here. They are logged and turned
/// into empty results, so callers always get a well-formed value.
pub struct LogService {
    state: SharedState,
}

impl LogService {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Fill in missing levels and streams. Entries whose message is blank
    /// are dropped; an explicit level is kept.
    pub fn classify(raw: Vec<RawLogEntry>) -> Vec<LogEntry> {
        raw.into_iter()
            .filter_map(|r| {
                let message = r.message.trim_end().to_string();
                if message.trim().is_empty() {
                    return None;
                }
                Some(LogEntry {
                    timestamp: r.timestamp,
                    level: r.level.unwrap_or_else(|| classify(&message)),
                    stream: r.stream.unwrap_or(StreamKind::Stdout),
                    message,
                })
            })
            .collect()
    }

    fn feed_request(&self, container_id: &str, follow: bool) -> FeedRequest {
        FeedRequest {
            follow,
            timestamps: self.state.config.timestamps,
            tail_lines: Some(self.state.config.tail_lines),
            ..FeedRequest::new(container_id)
        }
    }

    fn record_builder(&self) -> RecordBuilder {
        RecordBuilder::new(self.state.config.timestamps, self.state.config.multiline)
    }

    /// The last `tail_lines` records of a container, filtered for the live view.
    pub async fn live_logs(&self, container_id: &str, live: &LiveQuery) -> Vec<LogEntry> {
        let query = match live.to_query(Utc::now()) {
            Ok(query) => query,
            Err(e) => {
                warn!(container_id, error = %e, "Invalid live search");
                return Vec::new();
            }
        };

        let frames = match self.state.feed.open(self.feed_request(container_id, false)).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(container_id, error = %e, "Log feed unavailable, returning no live logs");
                return Vec::new();
            }
        };

        let entries = self.collect_entries(container_id, frames).await;
        QueryEngine::apply(entries, &query, QueryView::Live)
    }

    /// Decode a raw multiplexed byte stream (e.g. a captured feed) into records.
    pub async fn decode(&self, source: &str, chunks: ChunkStream) -> Vec<LogEntry> {
        let frames: FrameStream = Box::pin(DemuxStream::new(chunks, self.state.config.max_frame_bytes));
        self.collect_entries(source, frames).await
    }

    async fn collect_entries(&self, source: &str, mut frames: FrameStream) -> Vec<LogEntry> {
        let mut builder = self.record_builder();
        let mut entries = Vec::new();
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(frame) => entries.extend(builder.build(&frame)),
                Err(e) => {
                    warn!(source, error = %e, "Log feed failed mid-stream, keeping partial result");
                    break;
                }
            }
        }
        if builder.synthetic_count() > 0 {
            debug!(source, synthetic = builder.synthetic_count(), "Some records use processing-time timestamps");
        }
        entries
    }

    /// Continuous tail. Dropping the returned stream closes the feed.
    pub fn follow(&self, container_id: &str) -> EntryStream {
        let state = Arc::clone(&self.state);
        let request = self.feed_request(container_id, true);
        let mut builder = self.record_builder();

        Box::pin(async_stream::stream! {
            let container_id = request.container_id.clone();
            let mut frames = match state.feed.open(request).await {
                Ok(frames) => frames,
                Err(e) => {
                    warn!(container_id = %container_id, error = %e, "Log feed unavailable, follow ends");
                    return;
                }
            };
            info!(container_id = %container_id, "Following container logs");

            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(frame) => {
                        for entry in builder.build(&frame) {
                            yield entry;
                        }
                    }
                    Err(e) => {
                        warn!(container_id = %container_id, error = %e, "Follow stream failed");
                        break;
                    }
                }
            }
            debug!(container_id = %container_id, "Follow stream closed");
        })
    }

    /// Commit classified entries to today's storage unit.
    pub async fn save(&self, container_id: &str, container_name: &str, entries: &[LogEntry]) -> SaveSummary {
        match self.state.store.append(container_id, container_name, entries).await {
            Ok(outcome) => {
                info!(container_id, saved = outcome.saved, total = outcome.total, "Saved log entries");
                SaveSummary {
                    saved_count: outcome.saved,
                    total_count: outcome.total,
                }
            }
            Err(e) => {
                error!(container_id, error = %e, "Failed to save log entries");
                SaveSummary::default()
            }
        }
    }

    /// Classify caller-supplied entries, then save them.
    pub async fn save_raw(&self, container_id: &str, container_name: &str, raw: Vec<RawLogEntry>) -> SaveSummary {
        let entries = Self::classify(raw);
        self.save(container_id, container_name, &entries).await
    }

    /// Saved records matching `history`, newest first.
    pub async fn search(&self, history: &HistoryQuery) -> Vec<PersistedLogEntry> {
        match history.to_query() {
            Ok(query) => self.state.store.query(&query, QueryView::History).await,
            Err(e) => {
                warn!(error = %e, "Invalid history search");
                Vec::new()
            }
        }
    }

    /// Saved records for one container (or all), oldest first, rendered as `kind`.
    pub async fn export(&self, container_id: Option<&str>, kind: ExportKind) -> ExportPayload {
        let mut query = Query::new();
        query.container_id = container_id.map(str::to_string);
        let records = self.state.store.query(&query, QueryView::Export).await;

        let today = Utc::now().date_naive();
        match export::format(&records, kind, container_id, today) {
            Ok(payload) => {
                info!(count = records.len(), format = %kind, filename = %payload.filename, "Exported logs");
                payload
            }
            Err(e) => {
                error!(format = %kind, error = %e, "Failed to export logs");
                ExportPayload::empty(kind, container_id, today)
            }
        }
    }
}
