//! Logs module — record model, level classification, record building.

pub mod model;
pub mod level;
pub mod record;

pub use level::classify;
pub use model::{Level, LogEntry, PersistedLogEntry, RawLogEntry, StreamKind};
pub use record::{MultilinePolicy, RecordBuilder};
