//! # castframe-client
//!
//! Transport drivers for the CASTV2 de-framer.
//!
//! This crate provides:
//! - [`MessageReader`]: pulls messages out of any tokio `AsyncRead`
//! - [`BlockingReader`]: the same contract over `std::io::Read`
//! - TCP connection setup with timeouts

pub mod blocking;
pub mod connection;
pub mod error;
pub mod reader;

pub use blocking::BlockingReader;
pub use connection::{connect, ConnectionConfig};
pub use error::ClientError;
pub use reader::MessageReader;
