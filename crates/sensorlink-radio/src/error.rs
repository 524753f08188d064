use crate::channel::ChannelId;

/// Errors that can occur in radio transport operations.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    /// The radio device could not be opened.
    #[error("failed to open radio device {device}: {reason}")]
    Open { device: String, reason: String },

    /// A previous holder of the device panicked while it held the handle.
    #[error("radio device {device} is poisoned")]
    Poisoned { device: String },

    /// The driver failed to read a frame from a channel.
    #[error("receive on {channel} failed: {source}")]
    Receive {
        channel: ChannelId,
        source: std::io::Error,
    },

    /// The driver reported data but returned no bytes.
    #[error("receive on {channel} returned no data")]
    EmptyRead { channel: ChannelId },

    /// The driver returned more bytes than a frame can hold.
    #[error("receive on {channel} returned {len} bytes, max {max}")]
    Oversized {
        channel: ChannelId,
        len: usize,
        max: usize,
    },

    /// The receive-interrupt callback could not be installed.
    #[error("failed to install receive callback: {0}")]
    CallbackInstall(String),

    /// An I/O error occurred talking to the transceiver.
    #[error("radio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RadioError>;
