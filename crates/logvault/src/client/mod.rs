//! Client module — the log feed seam between the engine and the runtime.
//!
//! [`LogFeed`] is implemented by the bollard-backed `DockerClient` (`live`)
//! and by the in-memory [`fake::FakeFeed`] used in tests.

pub mod feed;
pub mod live;
pub mod fake;

pub use feed::LogFeed;
