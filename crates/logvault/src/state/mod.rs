//! State module — engine state shared by the service layer.

pub mod engine;

pub use engine::{EngineState, SharedState};
