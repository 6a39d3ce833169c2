//! Frame codec: cuts a byte stream into discrete protocol frames.
//!
//! TCP is a byte stream, not a message stream. One `read()` may return
//! half a frame, or three frames glued together. The codec owns that
//! problem so nothing above it ever sees a partial or merged frame.
//!
//! ## Frame format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! |   length (u32, big-endian)        |  payload  |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! The length counts payload bytes only (not the 4 length bytes). The
//! payload is UTF-8 text: `|`-delimited fields (see [`Command`]).
//!
//! [`FrameCodec`] implements tokio-util's `Decoder` and `Encoder`, so it
//! plugs straight into `Framed`, `FramedRead` and `FramedWrite`.
//!
//! [`Command`]: crate::Command

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::ProtocolError;

/// Default upper bound on a single frame's payload (64 KiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Size of the length prefix in bytes.
pub const LENGTH_FIELD_LEN: usize = 4;

/// Length-prefixed frame codec producing UTF-8 payload strings.
///
/// ## Example
///
/// ```rust
/// use bytes::BytesMut;
/// use roomcast_protocol::FrameCodec;
/// use tokio_util::codec::{Decoder, Encoder};
///
/// let mut codec = FrameCodec::new();
/// let mut buf = BytesMut::new();
/// codec.encode("LOGIN|alice|pw1", &mut buf).unwrap();
///
/// let frame = codec.decode(&mut buf).unwrap();
/// assert_eq!(frame.as_deref(), Some("LOGIN|alice|pw1"));
/// ```
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    /// Creates a codec with [`DEFAULT_MAX_FRAME_LEN`].
    pub fn new() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Creates a codec with a custom payload limit.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// Returns the configured payload limit.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Self::Item>, Self::Error> {
        // Not even the length prefix yet; wait for more bytes.
        if src.len() < LENGTH_FIELD_LEN {
            return Ok(None);
        }

        // Peek at the length without consuming it. If the frame turns
        // out to be incomplete we must leave the buffer untouched so the
        // next call sees the same prefix again.
        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]])
            as usize;

        // Reject oversized frames before buffering them, otherwise a
        // peer could make us allocate up to 4 GiB.
        if len > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let total = LENGTH_FIELD_LEN + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_LEN);
        let payload = src.split_to(len);

        String::from_utf8(payload.to_vec())
            .map(Some)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }
}

/// Anything string-like can be written as a frame: `&str`, `String`,
/// or the output of [`Command::encode`](crate::Command::encode).
impl<T: AsRef<str>> Encoder<T> for FrameCodec {
    type Error = ProtocolError;

    fn encode(
        &mut self,
        item: T,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        let payload = item.as_ref().as_bytes();
        if payload.len() > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len: payload.len(),
                max: self.max_frame_len,
            });
        }

        dst.reserve(LENGTH_FIELD_LEN + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(payload);
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
