//! Filter module — literal text matching, structured conditions, queries.

pub mod engine;
pub mod condition;
pub mod query;

pub use condition::{Condition, ConditionOperator, ConditionType, FilterCondition};
pub use engine::{FilterError, FilterMode, TextMatcher};
pub use query::{LevelFilter, Query, QueryEngine, QueryView, StreamFilter, TimeRange, TimeWindow};
