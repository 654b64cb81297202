//! Push-driven de-framer with a pull-based ready queue.
//!
//! The transport hands raw chunks to [`StreamFramer::ingest`] whenever bytes
//! become readable; the consumer pulls whole messages with
//! [`StreamFramer::next_message`]. Neither call ever waits on I/O.
//!
//! # Example
//!
//! ```
//! use castframe_protocol::{encode_frame, StreamFramer};
//!
//! let mut framer = StreamFramer::new();
//! let wire = encode_frame(b"{\"type\":\"PING\"}");
//!
//! framer.ingest(&wire[..3]).unwrap();
//! assert!(framer.next_message().is_none());
//!
//! framer.ingest(&wire[3..]).unwrap();
//! assert_eq!(&framer.next_message().unwrap()[..], b"{\"type\":\"PING\"}");
//! ```

use crate::config::FramerConfig;
use crate::error::ProtocolError;
use crate::frame::{peek_length, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE_LIMIT};
use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;

/// Parsing state of a framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Buffer holds zero or more bytes of an incomplete frame.
    Accumulating,
    /// A frame declared an oversized length. Terminal.
    Faulted { size: u32, max: u32 },
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Frames moved to the ready queue.
    pub frames_completed: u64,
    /// Bytes accepted into the buffer.
    pub bytes_ingested: u64,
    /// Bytes discarded because the framer was faulted.
    pub bytes_dropped: u64,
    /// Oversized empty buffers replaced with a fresh allocation.
    pub buffer_releases: u64,
}

/// Turns an arbitrarily chunked byte stream into length-delimited messages.
///
/// One instance per connection. The buffer only ever holds the prefix of an
/// incomplete frame; completed frames are split off into the ready queue
/// immediately.
#[derive(Debug)]
pub struct StreamFramer {
    buffer: BytesMut,
    ready: VecDeque<Bytes>,
    state: FramerState,
    max_frame_size: u32,
    initial_capacity: usize,
    shrink_threshold: usize,
    stats: FramerStats,
}

impl StreamFramer {
    /// Creates a framer with default settings.
    pub fn new() -> Self {
        Self::with_config(&FramerConfig::default())
    }

    /// Creates a framer with a custom frame size ceiling.
    ///
    /// Ceilings above [`MAX_FRAME_SIZE_LIMIT`] are clamped to it.
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self::with_config(&FramerConfig::default().with_max_frame_size(max_frame_size))
    }

    pub fn with_config(config: &FramerConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.initial_capacity),
            ready: VecDeque::new(),
            state: FramerState::Accumulating,
            max_frame_size: config.max_frame_size.min(MAX_FRAME_SIZE_LIMIT),
            initial_capacity: config.initial_capacity,
            shrink_threshold: config.shrink_threshold.max(config.initial_capacity),
            stats: FramerStats::default(),
        }
    }

    /// Appends a chunk and extracts every frame it completes.
    ///
    /// Returns the number of frames moved to the ready queue by this call.
    /// Once a frame declares a length above the ceiling the framer is faulted
    /// and every later call returns the same error without parsing.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<usize, ProtocolError> {
        if let FramerState::Faulted { size, max } = self.state {
            self.stats.bytes_dropped += chunk.len() as u64;
            return Err(ProtocolError::FrameTooLarge { size, max });
        }
        if chunk.is_empty() {
            return Ok(0);
        }

        self.buffer.extend_from_slice(chunk);
        self.stats.bytes_ingested += chunk.len() as u64;

        let mut completed = 0;
        while let Some(payload) = self.try_extract_one()? {
            tracing::trace!(len = payload.len(), "frame complete");
            self.ready.push_back(payload);
            self.stats.frames_completed += 1;
            completed += 1;
        }

        self.release_if_oversized();
        Ok(completed)
    }

    /// Extracts a single frame from the front of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(payload))` if a complete frame was split off
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the declared length exceeds the ceiling
    fn try_extract_one(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        let Some(len) = peek_length(&self.buffer) else {
            return Ok(None);
        };

        if len > self.max_frame_size {
            let max = self.max_frame_size;
            tracing::error!(size = len, max, "frame exceeds maximum size, framer faulted");
            self.state = FramerState::Faulted { size: len, max };
            self.stats.bytes_dropped += self.buffer.len() as u64;
            self.buffer = BytesMut::new();
            return Err(ProtocolError::FrameTooLarge { size: len, max });
        }

        let total = LENGTH_PREFIX_SIZE + len as usize;
        if self.buffer.len() < total {
            // Make room for the rest of the frame in one go.
            self.buffer.reserve(total - self.buffer.len());
            return Ok(None);
        }

        self.buffer.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(self.buffer.split_to(len as usize).freeze()))
    }

    /// Drops an emptied buffer whose allocation grew past the shrink threshold.
    fn release_if_oversized(&mut self) {
        if self.buffer.is_empty() && self.buffer.capacity() > self.shrink_threshold {
            tracing::debug!(
                capacity = self.buffer.capacity(),
                "releasing oversized framer buffer"
            );
            self.buffer = BytesMut::with_capacity(self.initial_capacity);
            self.stats.buffer_releases += 1;
        }
    }

    /// Dequeues the oldest completed message, or `None` if none is ready.
    pub fn next_message(&mut self) -> Option<Bytes> {
        self.ready.pop_front()
    }

    /// Yields every ready message in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        self.ready.drain(..)
    }

    /// Signals end of stream and tears the framer down.
    ///
    /// Reports a partial trailing frame as
    /// [`ProtocolError::StreamEndedWithPartialFrame`] and a prior fault as
    /// [`ProtocolError::FrameTooLarge`]. Undelivered ready messages are
    /// discarded with the framer.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.fault() {
            Some(fault) => Err(fault),
            None => self.check_partial(),
        }
    }

    /// Returns the partial-frame diagnostic for the current buffer, if any.
    pub fn check_partial(&self) -> Result<(), ProtocolError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        Err(ProtocolError::StreamEndedWithPartialFrame {
            buffered: self.buffer.len(),
            expected: peek_length(&self.buffer).map(|n| LENGTH_PREFIX_SIZE + n as usize),
        })
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self.state, FramerState::Faulted { .. })
    }

    /// Returns the error that faulted this framer, if any.
    pub fn fault(&self) -> Option<ProtocolError> {
        match self.state {
            FramerState::Faulted { size, max } => Some(ProtocolError::FrameTooLarge { size, max }),
            FramerState::Accumulating => None,
        }
    }

    /// Returns the number of bytes of the incomplete frame currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of completed messages waiting to be retrieved.
    pub fn pending(&self) -> usize {
        self.ready.len()
    }

    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Returns the allocated capacity of the internal buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}
