//! Store module — per-container, per-day persisted log collections.

pub mod error;
pub mod unit;
pub mod persist;

pub use error::StoreError;
pub use persist::{AppendOutcome, PersistentLogStore};
pub use unit::StorageKey;
