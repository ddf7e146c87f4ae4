//! Query — filter and order live or stored records.
//!
//! All active filters combine with AND. The view decides ordering and what
//! the free-text search looks at:
//!
//! | view    | order                 | search matches            |
//! |---------|-----------------------|---------------------------|
//! | Live    | arrival               | message                   |
//! | History | newest first          | message or container name |
//! | Export  | oldest first          | message or container name |

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use super::condition::{Condition, FilterCondition};
use super::engine::{FilterError, FilterMode, TextMatcher};
use crate::logs::model::{Level, LogEntry, PersistedLogEntry, StreamKind};

/// Inclusive time bounds; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Relative window used by the live view ("last 5 minutes" and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Minutes5,
    Hour1,
    Hours24,
}

impl TimeWindow {
    /// Resolve against `now` into an absolute range.
    pub fn to_range(self, now: DateTime<Utc>) -> TimeRange {
        let span = match self {
            TimeWindow::All => return TimeRange::default(),
            TimeWindow::Minutes5 => Duration::minutes(5),
            TimeWindow::Hour1 => Duration::hours(1),
            TimeWindow::Hours24 => Duration::hours(24),
        };
        TimeRange::new(Some(now - span), None)
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(TimeWindow::All),
            "5m" => Ok(TimeWindow::Minutes5),
            "1h" => Ok(TimeWindow::Hour1),
            "24h" => Ok(TimeWindow::Hours24),
            other => Err(format!("unknown time window: {}", other)),
        }
    }
}

/// Level filter; `all` (any case) is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelFilter {
    #[default]
    All,
    Only(Level),
}

impl FromStr for LevelFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("all") {
            return Ok(LevelFilter::All);
        }
        s.parse().map(LevelFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamFilter {
    #[default]
    All,
    Only(StreamKind),
}

impl FromStr for StreamFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("all") {
            return Ok(StreamFilter::All);
        }
        s.parse().map(StreamFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryView {
    Live,
    History,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Arrival,
    NewestFirst,
    OldestFirst,
}

impl QueryView {
    pub fn order(self) -> SortOrder {
        match self {
            QueryView::Live => SortOrder::Arrival,
            QueryView::History => SortOrder::NewestFirst,
            QueryView::Export => SortOrder::OldestFirst,
        }
    }

    /// Whether free-text search also looks at the container name.
    pub fn searches_container_name(self) -> bool {
        !matches!(self, QueryView::Live)
    }
}

/// Anything the query engine can filter.
pub trait Queryable {
    fn log_entry(&self) -> &LogEntry;

    fn container_id(&self) -> Option<&str> {
        None
    }

    fn container_name(&self) -> Option<&str> {
        None
    }
}

impl Queryable for LogEntry {
    fn log_entry(&self) -> &LogEntry {
        self
    }
}

impl Queryable for PersistedLogEntry {
    fn log_entry(&self) -> &LogEntry {
        &self.entry
    }

    fn container_id(&self) -> Option<&str> {
        Some(&self.container_id)
    }

    fn container_name(&self) -> Option<&str> {
        Some(&self.container_name)
    }
}

/// A parsed query. Build with the `with_*` methods.
#[derive(Debug, Default)]
pub struct Query {
    pub container_id: Option<String>,
    pub time_range: TimeRange,
    pub level: LevelFilter,
    pub stream: StreamFilter,
    search: Option<TextMatcher>,
    conditions: Vec<Condition>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn with_stream(mut self, stream: StreamFilter) -> Self {
        self.stream = stream;
        self
    }

    /// Free-text search; an empty string disables it.
    pub fn with_search(mut self, text: &str) -> Result<Self, FilterError> {
        self.search = if text.is_empty() {
            None
        } else {
            Some(TextMatcher::new(text, FilterMode::Include)?)
        };
        Ok(self)
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add caller-supplied conditions, dropping (and logging) any that do
    /// not parse so the rest of the query still runs.
    pub fn with_raw_conditions(mut self, raw: &[FilterCondition]) -> Self {
        for condition in raw {
            match Condition::try_from(condition) {
                Ok(parsed) => self.conditions.push(parsed),
                Err(e) => warn!(?condition, error = %e, "Ignoring invalid filter condition"),
            }
        }
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches<T: Queryable>(&self, record: &T, view: QueryView) -> bool {
        let entry = record.log_entry();

        if let (Some(wanted), Some(actual)) = (self.container_id.as_deref(), record.container_id()) {
            if wanted != actual {
                return false;
            }
        }
        if !self.time_range.contains(entry.timestamp) {
            return false;
        }
        if let LevelFilter::Only(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let StreamFilter::Only(stream) = self.stream {
            if entry.stream != stream {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let in_name = view.searches_container_name()
                && record.container_name().is_some_and(|name| search.contains(name));
            if !in_name && !search.contains(&entry.message) {
                return false;
            }
        }
        Condition::all_match(&self.conditions, entry)
    }
}

pub struct QueryEngine;

impl QueryEngine {
    /// Filter `records` and order them for `view`.
    pub fn apply<T: Queryable>(records: Vec<T>, query: &Query, view: QueryView) -> Vec<T> {
        let mut kept: Vec<T> = records.into_iter().filter(|r| query.matches(r, view)).collect();

        // Stable sorts: equal timestamps keep arrival order.
        match view.order() {
            SortOrder::Arrival => {}
            SortOrder::NewestFirst => kept.sort_by(|a, b| b.log_entry().timestamp.cmp(&a.log_entry().timestamp)),
            SortOrder::OldestFirst => kept.sort_by_key(|r| r.log_entry().timestamp),
        }
        kept
    }
}
