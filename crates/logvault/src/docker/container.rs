//! Container domain — reading a container's log feed through bollard.

use super::client::{DockerClient, DockerError};
use super::frame::Frame;
use super::stream::{FeedRequest, FrameStream};
use crate::logs::model::StreamKind;

use bollard::container::LogOutput;
use bollard::query_parameters::LogsOptions;
use futures_util::stream::StreamExt;

impl DockerClient {
    /// Open the container's combined stdout/stderr feed.
    ///
    /// bollard has already split the multiplexed body into frames, so each
    /// `LogOutput` maps straight onto a [`Frame`]. A TTY container's raw
    /// console output counts as stdout; stdin echo is dropped.
    pub async fn open_log_frames(&self, request: FeedRequest) -> Result<FrameStream, DockerError> {
        let since_raw = request.since.unwrap_or(0);
        if since_raw > i32::MAX as i64 {
            tracing::warn!(
                since = since_raw,
                max = i32::MAX,
                "Timestamp exceeds i32 range, clamping"
            );
        }
        let since = since_raw.clamp(0, i32::MAX as i64) as i32;

        let options = LogsOptions {
            follow: request.follow,
            stdout: true,
            stderr: true,
            since,
            until: 0,
            timestamps: request.timestamps,
            tail: request.tail_lines.map(|n| n.to_string()).unwrap_or_else(|| "all".to_string()),
        };

        let container_id = request.container_id.clone();
        let frames = self
            .client
            .logs(&request.container_id, Some(options))
            .filter_map(move |result| {
                let item = match result {
                    Ok(output) => convert_bollard_log(output).map(Ok),
                    Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                        Some(Err(DockerError::ContainerNotFound(container_id.clone())))
                    }
                    Err(e) => Some(Err(DockerError::from(e))),
                };
                std::future::ready(item)
            });

        Ok(Box::pin(frames))
    }
}

/// Converts Bollard's `LogOutput` to a [`Frame`], or `None` for non-data output.
pub(crate) fn convert_bollard_log(output: LogOutput) -> Option<Frame> {
    match output {
        LogOutput::StdOut { message } | LogOutput::Console { message } => {
            Some(Frame::new(StreamKind::Stdout, message))
        }
        LogOutput::StdErr { message } => Some(Frame::new(StreamKind::Stderr, message)),
        LogOutput::StdIn { .. } => None,
    }
}
