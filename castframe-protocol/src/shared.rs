//! Cross-thread framer handle.
//!
//! The buffer and ready queue are mutated as a unit during extraction, so both
//! sit behind one lock. The lock is held only for the duration of each call.

use crate::config::FramerConfig;
use crate::error::ProtocolError;
use crate::framer::{FramerStats, StreamFramer};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

/// A cloneable handle to one connection's framer.
///
/// Intended for one producer (the I/O readiness handler calling
/// [`ingest`](Self::ingest)) and one consumer (calling
/// [`next_message`](Self::next_message)) on different threads.
#[derive(Debug, Clone)]
pub struct SharedFramer {
    inner: Arc<Mutex<StreamFramer>>,
}

impl SharedFramer {
    pub fn new(framer: StreamFramer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(framer)),
        }
    }

    pub fn with_config(config: &FramerConfig) -> Self {
        Self::new(StreamFramer::with_config(config))
    }

    pub fn ingest(&self, chunk: &[u8]) -> Result<usize, ProtocolError> {
        self.inner.lock().ingest(chunk)
    }

    pub fn next_message(&self) -> Option<Bytes> {
        self.inner.lock().next_message()
    }

    pub fn buffered(&self) -> usize {
        self.inner.lock().buffered()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().pending()
    }

    pub fn is_faulted(&self) -> bool {
        self.inner.lock().is_faulted()
    }

    pub fn stats(&self) -> FramerStats {
        self.inner.lock().stats()
    }

    /// Returns the partial-frame diagnostic for end of stream, if any.
    pub fn check_partial(&self) -> Result<(), ProtocolError> {
        self.inner.lock().check_partial()
    }
}

impl Default for SharedFramer {
    fn default() -> Self {
        Self::new(StreamFramer::new())
    }
}
