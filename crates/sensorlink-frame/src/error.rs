/// Errors that can occur while building frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit in one frame next to the sequence byte.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload ends in a zero byte, which padding removal would eat.
    #[error("payload ends with a zero byte and cannot be padded unambiguously")]
    TrailingZero,

    /// The payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur while decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload is not a well-formed map of named fields.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A fixed decode budget was exhausted.
    #[error("out of decode resources: {0}")]
    OutOfResources(&'static str),
}

impl DecodeError {
    /// Short label for logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Malformed(_) => "malformed",
            DecodeError::OutOfResources(_) => "out_of_resources",
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
