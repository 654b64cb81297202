//! Async message reader.

use crate::connection::DEFAULT_READ_BUFFER_SIZE;
use crate::error::ClientError;
use bytes::Bytes;
use castframe_protocol::{FramerConfig, StreamFramer};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads whole CASTV2 messages from an async byte source.
///
/// Each reader owns the framer for exactly one connection.
pub struct MessageReader<R> {
    source: R,
    framer: StreamFramer,
    read_buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_config(source, &FramerConfig::default(), DEFAULT_READ_BUFFER_SIZE)
    }

    pub fn with_config(source: R, framer: &FramerConfig, read_buffer_size: usize) -> Self {
        Self {
            source,
            framer: StreamFramer::with_config(framer),
            read_buf: vec![0u8; read_buffer_size.max(1)],
            eof: false,
        }
    }

    /// Returns the next complete message.
    ///
    /// Reads from the source only when no message is already queued. Returns
    /// `Ok(None)` once the source is exhausted. If the source closes in the
    /// middle of a frame the first call after EOF returns
    /// [`ProtocolError::StreamEndedWithPartialFrame`](castframe_protocol::ProtocolError)
    /// and later calls return `Ok(None)`.
    ///
    /// Cancel safe: dropping the future between reads loses no bytes.
    pub async fn next_message(&mut self) -> Result<Option<Bytes>, ClientError> {
        loop {
            if let Some(msg) = self.framer.next_message() {
                return Ok(Some(msg));
            }
            if let Some(fault) = self.framer.fault() {
                return Err(fault.into());
            }
            if self.eof {
                return Ok(None);
            }

            tracing::debug!("waiting for data...");
            let n = self.source.read(&mut self.read_buf).await?;
            tracing::debug!("received {} bytes", n);

            if n == 0 {
                self.eof = true;
                if let Err(e) = self.framer.check_partial() {
                    tracing::warn!("connection closed mid-frame: {}", e);
                    return Err(e.into());
                }
                tracing::debug!("connection closed");
                return Ok(None);
            }

            // Messages completed ahead of a fault are delivered before it.
            if let Err(e) = self.framer.ingest(&self.read_buf[..n]) {
                if self.framer.pending() == 0 {
                    return Err(e.into());
                }
            }
        }
    }

    /// Returns whether the source has reported end of stream.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Returns the framer driving this reader.
    pub fn framer(&self) -> &StreamFramer {
        &self.framer
    }

    /// Returns the underlying source, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castframe_protocol::{encode_frame, ProtocolError};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_reads_across_split_reads() {
        let mut wire = encode_frame(b"alpha");
        wire.extend_from_slice(&encode_frame(b"beta"));
        let mock = tokio_test::io::Builder::new()
            .read(&wire[..3])
            .read(&wire[3..11])
            .read(&wire[11..])
            .build();

        let mut reader = MessageReader::new(mock);
        assert_eq!(&reader.next_message().await.unwrap().unwrap()[..], b"alpha");
        assert_eq!(&reader.next_message().await.unwrap().unwrap()[..], b"beta");
        assert!(reader.next_message().await.unwrap().is_none());
        assert!(reader.is_eof());
        assert!(reader.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_frame_at_eof() {
        let wire = encode_frame(b"cut short");
        let mock = tokio_test::io::Builder::new().read(&wire[..6]).build();

        let mut reader = MessageReader::new(mock);
        let err = reader.next_message().await.unwrap_err();
        assert!(err.is_partial_frame());
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::StreamEndedWithPartialFrame {
                buffered: 6,
                expected: Some(13),
            })
        ));

        // Reported once; afterwards the stream is simply finished
        assert!(reader.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame() {
        let mut wire = 65u32.to_be_bytes().to_vec();
        wire.extend_from_slice(&[0u8; 65]);
        let mock = tokio_test::io::Builder::new().read(&wire).build();

        let config = FramerConfig::default().with_max_frame_size(64);
        let mut reader = MessageReader::with_config(mock, &config, 1024);

        let err = reader.next_message().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::FrameTooLarge { size: 65, max: 64 })
        ));
        assert!(!err.is_retryable());
        assert!(reader.framer().is_faulted());
    }

    #[tokio::test]
    async fn test_messages_before_fault_are_delivered_first() {
        let mut wire = encode_frame(b"ok");
        wire.extend_from_slice(&u32::MAX.to_be_bytes());
        wire.extend_from_slice(&encode_frame(b"never"));
        let mock = tokio_test::io::Builder::new().read(&wire).build();

        let mut reader = MessageReader::new(mock);
        assert_eq!(&reader.next_message().await.unwrap().unwrap()[..], b"ok");

        let err = reader.next_message().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::FrameTooLarge { size: u32::MAX, .. })
        ));

        // The fault is sticky and no further reads are attempted
        let err = reader.next_message().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::FrameTooLarge { .. })
        ));
        assert!(!reader.is_eof());
        assert_eq!(reader.framer().stats().frames_completed, 1);
    }

    #[tokio::test]
    async fn test_io_error_propagates() {
        let mock = tokio_test::io::Builder::new()
            .read_error(std::io::ErrorKind::ConnectionReset.into())
            .build();

        let mut reader = MessageReader::new(mock);
        let err = reader.next_message().await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[tokio::test]
    async fn test_duplex_small_read_buffer() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = MessageReader::with_config(rx, &FramerConfig::default(), 3);

        let writer = tokio::spawn(async move {
            for i in 0..50u8 {
                tx.write_all(&encode_frame(&vec![i; i as usize])).await.unwrap();
            }
            tx.shutdown().await.unwrap();
        });

        let mut count = 0u8;
        while let Some(msg) = reader.next_message().await.unwrap() {
            assert_eq!(msg.len(), count as usize);
            assert!(msg.iter().all(|&b| b == count));
            count += 1;
        }
        assert_eq!(count, 50);
        writer.await.unwrap();
    }
}
