//! Receive channel (pipe) numbering.
//!
//! Pipe 0 belongs to the transmit/acknowledge path and is never drained.
//! Pipes 1-5 each receive from one pre-associated sensor node.

use std::fmt;

/// Fixed size of every radio frame on the air, in bytes.
pub const FRAME_SIZE: usize = 32;

/// Number of receive channels exposed by the transceiver.
pub const MAX_CHANNELS: u8 = 5;

/// One of the transceiver's receive channels, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    /// The first receive channel.
    pub const FIRST: ChannelId = ChannelId(1);

    /// The last receive channel.
    pub const LAST: ChannelId = ChannelId(MAX_CHANNELS);

    /// Create a channel id, returning `None` outside `1..=MAX_CHANNELS`.
    pub const fn new(raw: u8) -> Option<Self> {
        if raw >= 1 && raw <= MAX_CHANNELS {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Interpret a driver return value; zero or negative means "no data".
    pub fn from_raw(raw: i32) -> Option<Self> {
        u8::try_from(raw).ok().and_then(Self::new)
    }

    /// The 1-based channel number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position, suitable for indexing per-channel tables.
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// The next channel in round-robin order, wrapping from the last to the first.
    pub const fn next_wrapping(self) -> Self {
        if self.0 >= MAX_CHANNELS {
            Self::FIRST
        } else {
            Self(self.0 + 1)
        }
    }

    /// All receive channels in ascending order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (1..=MAX_CHANNELS).map(ChannelId)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipe{}", self.0)
    }
}
