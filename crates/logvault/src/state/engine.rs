//! Engine state — EngineState struct, shared state type alias.

use std::sync::Arc;
use std::time::Instant;

use crate::client::LogFeed;
use crate::conf::EngineConfig;
use crate::store::PersistentLogStore;

pub struct EngineState {
    pub feed: Arc<dyn LogFeed>,
    pub store: PersistentLogStore,
    pub config: EngineConfig,
    pub started_at: Instant,
}

impl EngineState {
    pub fn new(feed: Arc<dyn LogFeed>, config: EngineConfig) -> Self {
        Self {
            feed,
            store: PersistentLogStore::new(&config.data_dir),
            config,
            started_at: Instant::now(),
        }
    }
}

pub type SharedState = Arc<EngineState>;
