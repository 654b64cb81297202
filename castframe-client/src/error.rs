//! Client error types.

use castframe_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("connect timeout")]
    Timeout,
}

impl ClientError {
    /// Returns whether reconnecting may help.
    ///
    /// An oversized frame means the peer is speaking something else; every
    /// other failure is a lost connection.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Protocol(e) => !e.is_fatal(),
            ClientError::Io(_) | ClientError::Timeout => true,
        }
    }

    /// Returns whether the stream closed in the middle of a frame.
    pub fn is_partial_frame(&self) -> bool {
        matches!(
            self,
            ClientError::Protocol(ProtocolError::StreamEndedWithPartialFrame { .. })
        )
    }
}
