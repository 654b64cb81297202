//! Protocol error types.

use thiserror::Error;

/// Errors detected while de-framing a CASTV2 byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A length prefix declared more bytes than the configured ceiling.
    ///
    /// Fatal for the connection: frame boundaries after this point cannot be
    /// trusted.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    /// The stream closed while a frame was still incomplete.
    #[error("stream ended with partial frame: {buffered} bytes buffered{}", expected_suffix(.expected))]
    StreamEndedWithPartialFrame {
        buffered: usize,
        /// Full frame length (prefix included), if the prefix had arrived.
        expected: Option<usize>,
    },
}

fn expected_suffix(expected: &Option<usize>) -> String {
    match expected {
        Some(n) => format!(" of {n}"),
        None => String::new(),
    }
}

impl ProtocolError {
    /// Returns whether this error poisons the framer for the rest of the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::FrameTooLarge { .. })
    }
}
