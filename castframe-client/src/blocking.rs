//! Blocking message reader for `std::io::Read` sources.

use crate::connection::DEFAULT_READ_BUFFER_SIZE;
use crate::error::ClientError;
use bytes::Bytes;
use castframe_protocol::{FramerConfig, StreamFramer};
use std::io::{ErrorKind, Read};

/// Reads whole CASTV2 messages from a blocking byte source.
///
/// Same contract as [`MessageReader`](crate::MessageReader). As an iterator
/// it stops after the first error.
pub struct BlockingReader<R> {
    source: R,
    framer: StreamFramer,
    read_buf: Vec<u8>,
    eof: bool,
    failed: bool,
}

impl<R: Read> BlockingReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_config(source, &FramerConfig::default(), DEFAULT_READ_BUFFER_SIZE)
    }

    pub fn with_config(source: R, framer: &FramerConfig, read_buffer_size: usize) -> Self {
        Self {
            source,
            framer: StreamFramer::with_config(framer),
            read_buf: vec![0u8; read_buffer_size.max(1)],
            eof: false,
            failed: false,
        }
    }

    /// Returns the next complete message, blocking on the source as needed.
    pub fn next_message(&mut self) -> Result<Option<Bytes>, ClientError> {
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

            let n = match self.source.read(&mut self.read_buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if n == 0 {
                self.eof = true;
                if let Err(e) = self.framer.check_partial() {
                    tracing::warn!("stream ended mid-frame: {}", e);
                    return Err(e.into());
                }
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

    pub fn framer(&self) -> &StreamFramer {
        &self.framer
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read> Iterator for BlockingReader<R> {
    type Item = Result<Bytes, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_message() {
            Ok(Some(msg)) => Some(Ok(msg)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
