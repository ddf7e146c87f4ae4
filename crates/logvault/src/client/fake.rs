//! Fake — test double for the container log feed.
//!
//! [`FakeFeed`] serves canned multiplexed byte chunks per container, pushed
//! through the real [`DemuxStream`], so everything above the transport runs
//! exactly as it would against a daemon.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::stream::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

use crate::client::feed::LogFeed;
use crate::docker::client::DockerError;
use crate::docker::frame::DEFAULT_MAX_FRAME_BYTES;
use crate::docker::stream::{DemuxStream, FeedRequest, FrameStream};

/// Canned feed content for one container.
#[derive(Default)]
struct FakeContainer {
    /// Chunks replayed on every open.
    chunks: Vec<Bytes>,
    /// Live chunks for follow mode; taken by the first follow open.
    live: Option<mpsc::Receiver<Bytes>>,
}

/// A fake log feed for deterministic testing.
pub struct FakeFeed {
    containers: Mutex<HashMap<String, FakeContainer>>,
    available: AtomicBool,
    max_frame_bytes: usize,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self {
            containers: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Seed raw multiplexed chunks for a container.
    pub async fn add_chunks(&self, container_id: &str, chunks: Vec<Vec<u8>>) {
        let mut state = self.containers.lock().await;
        let container = state.entry(container_id.to_string()).or_default();
        container.chunks.extend(chunks.into_iter().map(Bytes::from));
    }

    /// Attach a live channel; chunks sent on the returned sender are delivered
    /// to the next follow-mode open after the seeded chunks.
    pub async fn attach(&self, container_id: &str) -> mpsc::Sender<Bytes> {
        let (tx, rx) = mpsc::channel(64);
        let mut state = self.containers.lock().await;
        state.entry(container_id.to_string()).or_default().live = Some(rx);
        tx
    }

    /// Simulate the daemon going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for FakeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFeed for FakeFeed {
    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), DockerError>> + Send + '_>> {
        Box::pin(async move {
            if self.available.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(DockerError::Unavailable)
            }
        })
    }

    fn open(
        &self,
        request: FeedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FrameStream, DockerError>> + Send + '_>> {
        Box::pin(async move {
            if !self.available.load(Ordering::SeqCst) {
                return Err(DockerError::Unavailable);
            }

            let mut state = self.containers.lock().await;
            let container = state
                .get_mut(&request.container_id)
                .ok_or_else(|| DockerError::ContainerNotFound(request.container_id.clone()))?;

            let replay = tokio_stream::iter(container.chunks.clone().into_iter().map(Ok));
            let live = if request.follow { container.live.take() } else { None };

            let frames: FrameStream = match live {
                Some(rx) => {
                    let chunks = replay.chain(ReceiverStream::new(rx).map(Ok));
                    Box::pin(DemuxStream::new(chunks, self.max_frame_bytes))
                }
                None => Box::pin(DemuxStream::new(replay, self.max_frame_bytes)),
            };
            Ok(frames)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::frame::encode_frame;
    use crate::logs::model::StreamKind;

    #[tokio::test]
    async fn test_open_unknown_container() {
        let feed = FakeFeed::new();
        let result = feed.open(FeedRequest::new("missing")).await;
        assert!(matches!(result, Err(DockerError::ContainerNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_unavailable_feed() {
        let feed = FakeFeed::new();
        feed.set_available(false);
        assert!(feed.ping().await.is_err());
        assert!(matches!(
            feed.open(FeedRequest::new("c1")).await,
            Err(DockerError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_replays_seeded_chunks() {
        let feed = FakeFeed::new();
        let bytes = encode_frame(2, b"oops");
        feed.add_chunks("c1", vec![bytes[..3].to_vec(), bytes[3..].to_vec()]).await;

        let frames: Vec<_> = feed.open(FeedRequest::new("c1")).await.unwrap().collect().await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap().stream, StreamKind::Stderr);

        // Replays are repeatable.
        let again: Vec<_> = feed.open(FeedRequest::new("c1")).await.unwrap().collect().await;
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn test_frame_limit_skips_oversized_frame() {
        let feed = FakeFeed::new().with_max_frame_bytes(16);
        let mut bytes = encode_frame(1, b"this payload is longer than sixteen bytes");
        bytes.extend(encode_frame(2, b"short"));
        feed.add_chunks("c1", vec![bytes]).await;

        let frames: Vec<_> = feed.open(FeedRequest::new("c1")).await.unwrap().collect().await;
        let last = frames.last().unwrap().as_ref().unwrap();
        assert_eq!(last.stream, StreamKind::Stderr);
        assert_eq!(last.payload, Bytes::from("short"));
    }

    #[tokio::test]
    async fn test_follow_reads_live_channel() {
        let feed = FakeFeed::new();
        feed.add_chunks("c1", vec![encode_frame(1, b"seed")]).await;
        let tx = feed.attach("c1").await;

        let mut request = FeedRequest::new("c1");
        request.follow = true;
        let mut frames = feed.open(request).await.unwrap();

        assert_eq!(frames.next().await.unwrap().unwrap().payload, Bytes::from("seed"));
        tx.send(Bytes::from(encode_frame(1, b"live"))).await.unwrap();
        assert_eq!(frames.next().await.unwrap().unwrap().payload, Bytes::from("live"));

        drop(tx);
        assert!(frames.next().await.is_none());
    }
}
