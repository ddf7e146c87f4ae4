use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio_stream::Stream;

use super::client::DockerError;
use super::frame::{Frame, FrameDemultiplexer};

// Cooperative yielding budget: a single large chunk can complete thousands of
// frames, so hand control back to the executor periodically.
const POLL_BUDGET: usize = 1024;

/// Raw multiplexed bytes as delivered by the transport.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, DockerError>> + Send>>;

/// Demultiplexed frames, ready for record building.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, DockerError>> + Send>>;

/// What to read from a container's log feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub container_id: String,
    pub follow: bool,                    // tail -f mode
    pub timestamps: bool,                // ask the runtime to prefix each line
    pub tail_lines: Option<u32>,         // like "docker logs --tail 100"
    pub since: Option<i64>,              // Unix seconds
}

impl FeedRequest {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            follow: false,
            timestamps: true,
            tail_lines: None,
            since: None,
        }
    }
}

/// Adapts a stream of arbitrarily sized byte chunks into a stream of frames.
///
/// When the inner stream ends (the follow connection closed, or the caller
/// stopped the feed) any partial trailing frame is dropped silently.
pub struct DemuxStream {
    inner: ChunkStream,
    demux: Option<FrameDemultiplexer>,
}

impl DemuxStream {
    pub fn new(
        inner: impl Stream<Item = Result<Bytes, DockerError>> + Send + 'static,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            inner: Box::pin(inner),
            demux: Some(FrameDemultiplexer::new(max_frame_bytes)),
        }
    }
}

impl Stream for DemuxStream {
    type Item = Result<Frame, DockerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut budget = POLL_BUDGET;

        loop {
            if budget == 0 {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            budget -= 1;

            // DemuxStream is Unpin (boxed inner stream, owned decoder)
            let this = self.as_mut().get_mut();

            let Some(demux) = this.demux.as_mut() else {
                return Poll::Ready(None);
            };

            if let Some(frame) = demux.next_frame() {
                return Poll::Ready(Some(Ok(frame)));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => demux.push(&chunk),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    if let Some(demux) = this.demux.take() {
                        demux.finish();
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::frame::{encode_frame, DEFAULT_MAX_FRAME_BYTES};
    use crate::logs::model::StreamKind;
    use tokio_stream::StreamExt;

    fn chunked(bytes: Vec<u8>, size: usize) -> impl Stream<Item = Result<Bytes, DockerError>> + Send {
        let chunks: Vec<Result<Bytes, DockerError>> = bytes
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        tokio_stream::iter(chunks)
    }

    #[tokio::test]
    async fn test_frames_across_one_byte_chunks() {
        let mut bytes = encode_frame(1, b"first");
        bytes.extend(encode_frame(2, b"second"));

        let frames: Vec<_> = DemuxStream::new(chunked(bytes, 1), DEFAULT_MAX_FRAME_BYTES)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(
            frames,
            vec![
                Frame::new(StreamKind::Stdout, &b"first"[..]),
                Frame::new(StreamKind::Stderr, &b"second"[..]),
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_trailing_frame_is_dropped() {
        let mut bytes = encode_frame(1, b"whole");
        let tail = encode_frame(1, b"never finished");
        bytes.extend_from_slice(&tail[..tail.len() - 3]);

        let frames: Vec<_> = DemuxStream::new(chunked(bytes, 7), DEFAULT_MAX_FRAME_BYTES)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_ok());
    }

    #[tokio::test]
    async fn test_transport_error_is_forwarded() {
        let items: Vec<Result<Bytes, DockerError>> = vec![
            Ok(Bytes::from(encode_frame(1, b"ok"))),
            Err(DockerError::StreamClosed),
        ];
        let results: Vec<_> = DemuxStream::new(tokio_stream::iter(items), DEFAULT_MAX_FRAME_BYTES)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DockerError::StreamClosed)));
    }
}
