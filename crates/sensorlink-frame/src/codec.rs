use sensorlink_radio::{ChannelId, FRAME_SIZE};

use crate::error::{FrameError, Result};

/// Trailing sequence counter: 1 byte.
pub const SEQUENCE_LEN: usize = 1;

/// Largest payload that fits in one frame.
pub const MAX_PAYLOAD: usize = FRAME_SIZE - SEQUENCE_LEN;

/// Fixed-capacity storage for one frame.
pub type FrameBuf = heapless::Vec<u8, FRAME_SIZE>;

/// One frame as read from a receive channel.
///
/// Frame layout:
/// ```text
/// ┌──────────────────────┬───────────────┬──────────────┐
/// │ Payload (CBOR map)   │ Zero padding  │ Sequence (1B)│
/// │ effective_len bytes  │               │ ignored      │
/// └──────────────────────┴───────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioFrame {
    channel: ChannelId,
    buf: FrameBuf,
}

impl RadioFrame {
    /// Copy `bytes` into a new frame. Fails if more than `FRAME_SIZE` bytes.
    pub fn new(channel: ChannelId, bytes: &[u8]) -> Result<Self> {
        let buf = FrameBuf::from_slice(bytes).map_err(|_| FrameError::PayloadTooLarge {
            size: bytes.len(),
            max: FRAME_SIZE,
        })?;
        Ok(Self { channel, buf })
    }

    /// Channel the frame arrived on.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Raw bytes as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable raw bytes; [`reclaim`] works in place.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Number of bytes received.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if no bytes were received.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Sender's sequence counter (last byte), if any byte was received.
    pub fn sequence(&self) -> Option<u8> {
        self.buf.last().copied()
    }

    /// Recover the payload in place. See [`reclaim`].
    pub fn reclaim(&mut self) -> &[u8] {
        reclaim(&mut self.buf)
    }
}

/// Recover the logical payload from a received frame.
///
/// The last byte is the sequence counter: it is zeroed in place and dropped.
/// Then every trailing zero byte is dropped. A frame that is all zeros after
/// the sequence byte yields an empty payload.
pub fn reclaim(frame: &mut [u8]) -> &[u8] {
    if let Some(last) = frame.last_mut() {
        *last = 0;
    }
    let len = effective_len(frame);
    &frame[..len]
}

/// Length of the payload in `frame`, without modifying it.
pub fn effective_len(frame: &[u8]) -> usize {
    let body = match frame.len().checked_sub(SEQUENCE_LEN) {
        Some(len) => &frame[..len],
        None => return 0,
    };
    strip_padding(body).len()
}

/// Drop trailing zero bytes. Idempotent.
pub fn strip_padding(bytes: &[u8]) -> &[u8] {
    let len = bytes
        .iter()
        .rposition(|b| *b != 0)
        .map_or(0, |last| last + 1);
    &bytes[..len]
}
