//! Frame — incremental decoder for the Docker multiplexed log stream.
//!
//! Each frame is an 8-byte header followed by its payload:
//!
//! ```text
//! [origin, 0, 0, 0, len_be[0], len_be[1], len_be[2], len_be[3]] payload...
//! ```
//!
//! Bytes arrive in arbitrary chunks. The decoder is a two-state machine
//! (`Header` → `Payload` → `Header`) over an accumulating buffer; a frame is
//! only emitted once its header and full payload are buffered.
//!
//! A header declaring more than `max_frame_bytes` is corrupt: the decoder
//! drops one byte at a time until it lines up with a plausible header again.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::logs::model::StreamKind;

pub const HEADER_LEN: usize = 8;

/// Default upper bound for a declared payload length. Anything above this is
/// treated as a corrupt header rather than an allocation request.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// One demultiplexed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub stream: StreamKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(stream: StreamKind, payload: impl Into<Bytes>) -> Self {
        Self { stream, payload: payload.into() }
    }

    /// Encode this frame in wire format.
    pub fn encode(&self) -> Vec<u8> {
        let origin = match self.stream {
            StreamKind::Stdout => 1,
            StreamKind::Stderr => 2,
        };
        encode_frame(origin, &self.payload)
    }
}

/// Encode an arbitrary frame, including non-data origins.
pub fn encode_frame(origin: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(origin);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DemuxState {
    /// Waiting for a full 8-byte header.
    Header,
    /// Header consumed; waiting for `len` payload bytes.
    Payload { origin: u8, len: usize },
}

/// Counters describing what the decoder has seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DemuxStats {
    pub frames: u64,
    pub skipped_frames: u64,
    pub resync_bytes: u64,
}

pub struct FrameDemultiplexer {
    buf: BytesMut,
    state: DemuxState,
    max_frame_bytes: usize,
    resyncing: bool,
    stats: DemuxStats,
}

impl FrameDemultiplexer {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            state: DemuxState::Header,
            max_frame_bytes,
            resyncing: false,
            stats: DemuxStats::default(),
        }
    }

    /// Append a chunk of raw bytes. No frames are decoded until pulled.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Append a chunk and iterate over every frame it completes.
    pub fn feed<'a>(&'a mut self, chunk: &[u8]) -> Frames<'a> {
        self.push(chunk);
        Frames { demux: self }
    }

    /// Decode the next complete data frame, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match self.state {
                DemuxState::Header => {
                    if self.buf.len() < HEADER_LEN {
                        return None;
                    }
                    let origin = self.buf[0];
                    let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;

                    // While resynchronizing only a strictly well-formed header
                    // (known origin, zeroed reserved bytes) ends the scan.
                    let plausible = len <= self.max_frame_bytes
                        && (!self.resyncing || (origin <= 2 && self.buf[1..4] == [0, 0, 0]));

                    if !plausible {
                        if !self.resyncing {
                            warn!(
                                declared_len = len,
                                max = self.max_frame_bytes,
                                "Malformed frame header, resynchronizing"
                            );
                            self.resyncing = true;
                        }
                        self.buf.advance(1);
                        self.stats.resync_bytes += 1;
                        continue;
                    }

                    if self.resyncing {
                        debug!(discarded = self.stats.resync_bytes, "Resynchronized on frame header");
                        self.resyncing = false;
                    }

                    self.buf.advance(HEADER_LEN);
                    self.state = DemuxState::Payload { origin, len };
                }
                DemuxState::Payload { origin, len } => {
                    if self.buf.len() < len {
                        return None;
                    }
                    let payload = self.buf.split_to(len).freeze();
                    self.state = DemuxState::Header;

                    match StreamKind::from_origin(origin) {
                        Some(stream) => {
                            self.stats.frames += 1;
                            return Some(Frame { stream, payload });
                        }
                        None => {
                            trace!(origin, len, "Skipping non-data frame");
                            self.stats.skipped_frames += 1;
                        }
                    }
                }
            }
        }
    }

    /// Bytes buffered but not yet part of an emitted frame.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// End of input: drop any partial trailing frame. Returns the number of
    /// bytes discarded.
    pub fn finish(mut self) -> usize {
        let discarded = self.buf.len();
        if discarded > 0 {
            debug!(discarded, "Discarding partial trailing frame");
        }
        self.buf.clear();
        self.state = DemuxState::Header;
        discarded
    }
}

impl Default for FrameDemultiplexer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

/// Iterator over the frames currently decodable from a demultiplexer.
pub struct Frames<'a> {
    demux: &'a mut FrameDemultiplexer,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.demux.next_frame()
    }
}
