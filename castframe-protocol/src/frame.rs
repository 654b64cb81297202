//! CASTV2 frame layout.
//!
//! Every message on the wire is a big-endian length followed by the payload:
//!
//! ```text
//! +-------------+---------------------+
//! | payload_len | payload             |
//! |   4 bytes   | payload_len bytes   |
//! +-------------+---------------------+
//! ```
//!
//! There is no magic, checksum, terminator or escaping. Boundaries exist only
//! through the declared length.

use bytes::{BufMut, BytesMut};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default ceiling for a single frame's payload (1 MiB).
///
/// Cast receivers cap messages at 64 KiB; the extra headroom tolerates
/// non-conforming senders without letting a corrupt prefix claim gigabytes.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Highest ceiling a framer accepts.
///
/// Keeps `LENGTH_PREFIX_SIZE + len` within `isize::MAX` on 32-bit targets.
pub const MAX_FRAME_SIZE_LIMIT: u32 = i32::MAX as u32 - LENGTH_PREFIX_SIZE as u32;

/// Reads the length prefix at the front of `buf` without consuming it.
///
/// Returns `None` if fewer than [`LENGTH_PREFIX_SIZE`] bytes are available.
pub fn peek_length(buf: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buf.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}

/// Builds the wire representation of one frame.
///
/// Sending is outside this crate's job; this exists for tests, benches and
/// tooling that need to synthesise streams.
pub fn encode_frame(payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_length() {
        assert_eq!(peek_length(&[0x00, 0x00, 0x01, 0x02]), Some(0x0102));
        assert_eq!(peek_length(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00]), Some(u32::MAX));
        assert_eq!(peek_length(&[0x00, 0x00, 0x00]), None);
        assert_eq!(peek_length(&[]), None);
    }

    #[test]
    fn test_encode_frame_layout() {
        let encoded = encode_frame(b"hello");
        assert_eq!(&encoded[..4], &[0, 0, 0, 5]);
        assert_eq!(&encoded[4..], b"hello");
    }

    #[test]
    fn test_encode_empty_payload() {
        let encoded = encode_frame(&[]);
        assert_eq!(&encoded[..], &[0, 0, 0, 0]);
    }
}
