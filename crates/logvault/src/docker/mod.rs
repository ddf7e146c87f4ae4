//! Docker module — daemon client, multiplexed frame decoding, chunk streams.

pub mod client;
pub mod container;
pub mod frame;
pub mod stream;

pub use client::{DockerClient, DockerError};
pub use frame::{Frame, FrameDemultiplexer};
