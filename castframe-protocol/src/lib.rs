//! # castframe-protocol
//!
//! Stream de-framer for the Chromecast CASTV2 wire protocol.
//!
//! This crate provides:
//! - Length-prefixed framing (`[u32 BE length][payload]`)
//! - [`StreamFramer`]: push-driven ingest with a pull-based FIFO of completed messages
//! - [`SharedFramer`]: the same framer behind a single lock for cross-thread use
//! - Framer configuration loaded from YAML and environment variables

pub mod config;
pub mod error;
pub mod frame;
pub mod framer;
pub mod shared;

pub use config::{ConfigError, FramerConfig};
pub use error::ProtocolError;
pub use frame::{
    encode_frame, peek_length, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE_LIMIT,
};
pub use framer::{FramerState, FramerStats, StreamFramer};
pub use shared::SharedFramer;

/// Default port a cast receiver listens on.
pub const DEFAULT_CAST_PORT: u16 = 8009;
