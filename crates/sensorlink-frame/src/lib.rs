//! Fixed-size radio frames and their payloads.
//!
//! Every frame on the air is exactly [`FRAME_SIZE`] bytes:
//! - the encoded payload, a CBOR map of `{field: value, ...}`
//! - zero padding up to the last byte
//! - a 1-byte sequence counter in the last position
//!
//! [`reclaim`] recovers the payload from a received frame and
//! [`PayloadDecoder`] turns it into an ordered list of [`Field`]s using
//! bounded, pooled buffers.

pub mod codec;
pub mod error;
pub mod payload;
pub mod pool;
pub mod reader;
pub mod writer;

pub use codec::{
    effective_len, reclaim, strip_padding, FrameBuf, RadioFrame, MAX_PAYLOAD, SEQUENCE_LEN,
};
pub use error::{DecodeError, FrameError, Result};
pub use payload::{
    encode_payload, DecodedPayload, DecoderConfig, EmptyPayload, Field, FieldValue,
    PayloadDecoder,
};
pub use pool::{BufferPool, PoolLease};
pub use reader::receive_frame;
pub use sensorlink_radio::FRAME_SIZE;
pub use writer::FrameWriter;
