//! Feed — trait abstraction over where container logs come from.

use std::future::Future;
use std::pin::Pin;

use crate::docker::client::DockerError;
use crate::docker::stream::{FeedRequest, FrameStream};

/// Source of multiplexed container log feeds.
///
/// Methods return boxed futures so the trait stays object safe and the
/// service layer can hold an `Arc<dyn LogFeed>`.
pub trait LogFeed: Send + Sync {
    /// Check whether the runtime is reachable.
    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), DockerError>> + Send + '_>>;

    /// Open a container's feed as a stream of demultiplexed frames.
    fn open(
        &self,
        request: FeedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FrameStream, DockerError>> + Send + '_>>;
}
