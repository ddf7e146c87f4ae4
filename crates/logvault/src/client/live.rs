//! Live — implements `LogFeed` for the real Bollard-backed `DockerClient`.

use std::future::Future;
use std::pin::Pin;

use crate::client::feed::LogFeed;
use crate::docker::client::{DockerClient, DockerError};
use crate::docker::stream::{FeedRequest, FrameStream};

impl LogFeed for DockerClient {
    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), DockerError>> + Send + '_>> {
        Box::pin(DockerClient::ping(self))
    }

    fn open(
        &self,
        request: FeedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FrameStream, DockerError>> + Send + '_>> {
        Box::pin(self.open_log_frames(request))
    }
}
