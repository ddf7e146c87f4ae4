//! Condition — structured filter predicates.
//!
//! A [`FilterCondition`] is the wire shape (`type` / `operator` / `value`).
//! It is parsed once into a [`Condition`], a tagged union whose variants each
//! carry their own evaluator. A query ANDs every condition.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::engine::{FilterError, FilterMode, TextMatcher};
use crate::logs::model::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Level,
    Stream,
    Message,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    Contains,
    NotContains,
    Before,
    After,
}

/// A condition as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    #[serde(rename = "type")]
    pub kind: ConditionType,
    pub operator: ConditionOperator,
    pub value: String,
}

impl FilterCondition {
    pub fn new(kind: ConditionType, operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self { kind, operator, value: value.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("Operator {operator:?} is not supported for {kind:?} conditions")]
    UnsupportedOperator {
        kind: ConditionType,
        operator: ConditionOperator,
    },
    #[error("Invalid value for {kind:?} condition: {value}")]
    InvalidValue { kind: ConditionType, value: String },
    #[error(transparent)]
    Pattern(#[from] FilterError),
}

/// A parsed, ready-to-evaluate condition.
pub enum Condition {
    /// Exact, case-sensitive comparison with the level's wire name.
    LevelIs(String),
    /// Exact, case-sensitive comparison with the stream's wire name.
    StreamIs(String),
    /// Case-insensitive substring, mode decides contains / not contains.
    Message(TextMatcher),
    Before(DateTime<Utc>),
    After(DateTime<Utc>),
}

impl Condition {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        match self {
            Condition::LevelIs(level) => entry.level.as_str() == level.as_str(),
            Condition::StreamIs(stream) => entry.stream.as_str() == stream.as_str(),
            Condition::Message(matcher) => matcher.should_include(&entry.message),
            Condition::Before(ts) => entry.timestamp < *ts,
            Condition::After(ts) => entry.timestamp > *ts,
        }
    }

    /// True when `entry` satisfies every condition (vacuously true when empty).
    pub fn all_match(conditions: &[Condition], entry: &LogEntry) -> bool {
        conditions.iter().all(|c| c.matches(entry))
    }
}

impl TryFrom<&FilterCondition> for Condition {
    type Error = ConditionError;

    fn try_from(raw: &FilterCondition) -> Result<Self, Self::Error> {
        use ConditionOperator as Op;
        use ConditionType as Ty;

        let invalid = || ConditionError::InvalidValue {
            kind: raw.kind,
            value: raw.value.clone(),
        };

        match (raw.kind, raw.operator) {
            (Ty::Level, Op::Equals) => Ok(Condition::LevelIs(raw.value.clone())),
            (Ty::Stream, Op::Equals) => Ok(Condition::StreamIs(raw.value.clone())),
            (Ty::Message, Op::Contains) => Ok(Condition::Message(TextMatcher::new(&raw.value, FilterMode::Include)?)),
            (Ty::Message, Op::NotContains) => Ok(Condition::Message(TextMatcher::new(&raw.value, FilterMode::Exclude)?)),
            (Ty::Time, Op::Before) => parse_instant(&raw.value).map(Condition::Before).ok_or_else(invalid),
            (Ty::Time, Op::After) => parse_instant(&raw.value).map(Condition::After).ok_or_else(invalid),
            (kind, operator) => Err(ConditionError::UnsupportedOperator { kind, operator }),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::LevelIs(level) => write!(f, "level == {:?}", level),
            Condition::StreamIs(stream) => write!(f, "stream == {:?}", stream),
            Condition::Message(m) if m.mode() == FilterMode::Include => write!(f, "message contains {:?}", m.needle()),
            Condition::Message(m) => write!(f, "message not_contains {:?}", m.needle()),
            Condition::Before(ts) => write!(f, "time before {}", ts),
            Condition::After(ts) => write!(f, "time after {}", ts),
        }
    }
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
