// Service layer: the surfaces callers use (live view, save, history, export, health)
pub mod logs;
pub mod health;

pub use logs::{EntryStream, HistoryQuery, LiveQuery, LogService, SaveSummary};
pub use health::{HealthReport, HealthStatus};
