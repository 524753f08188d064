use sensorlink_radio::FRAME_SIZE;

use crate::codec::{FrameBuf, MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::payload::{encode_payload, Field};

/// Builds outgoing frames the way sensor nodes transmit them.
///
/// Each frame is the payload, zero padding, and a sequence byte that
/// increments (wrapping) with every frame built.
#[derive(Debug, Clone, Default)]
pub struct FrameWriter {
    next_sequence: u8,
}

impl FrameWriter {
    /// Start at sequence 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at an explicit sequence number.
    pub fn with_sequence(sequence: u8) -> Self {
        Self {
            next_sequence: sequence,
        }
    }

    /// Pad `payload` to a full frame and stamp the next sequence number.
    pub fn build(&mut self, payload: &[u8]) -> Result<FrameBuf> {
        let too_large = || FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        };
        if payload.len() > MAX_PAYLOAD {
            return Err(too_large());
        }
        if payload.last() == Some(&0) {
            return Err(FrameError::TrailingZero);
        }

        let mut frame = FrameBuf::from_slice(payload).map_err(|_| too_large())?;
        frame.resize(FRAME_SIZE - 1, 0).map_err(|_| too_large())?;
        frame.push(self.next_sequence).map_err(|_| too_large())?;

        self.next_sequence = self.next_sequence.wrapping_add(1);
        Ok(frame)
    }

    /// Encode `fields` and build a frame from them.
    pub fn build_fields(&mut self, fields: &[Field]) -> Result<FrameBuf> {
        let payload = encode_payload(fields)?;
        self.build(&payload)
    }

    /// Sequence number the next frame will carry.
    pub fn next_sequence(&self) -> u8 {
        self.next_sequence
    }
}
