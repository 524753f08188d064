use sensorlink_frame::DecodeError;
use sensorlink_radio::{ChannelId, RadioError};
use sensorlink_registry::{ReadError, RegistryError, UnknownFieldError, UnknownNodeError};

/// Errors that stop the router itself.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Radio-level error while starting.
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),

    /// Table construction error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Router configuration is not valid JSON for the expected shape.
    #[error("invalid router config: {0}")]
    Config(#[from] serde_json::Error),

    /// The drain worker thread could not be started.
    #[error("failed to spawn drain worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The drain worker panicked outside of a listener.
    #[error("drain worker panicked")]
    WorkerPanicked,
}

/// Why a whole frame was dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// No node address is configured for the channel.
    #[error("no node assigned to {0}")]
    UnassignedChannel(ChannelId),

    /// The node has no registered virtual sensor.
    #[error(transparent)]
    UnknownNode(#[from] UnknownNodeError),

    /// The payload could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl DispatchError {
    /// Short name used in logs and statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::UnassignedChannel(_) => "unassigned_channel",
            DispatchError::UnknownNode(_) => "unknown_node",
            DispatchError::Decode(err) => err.kind(),
        }
    }
}

/// Why a single field was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error(transparent)]
    UnknownField(#[from] UnknownFieldError),

    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    /// A listener panicked while handling the reading.
    #[error("listener panicked: {0}")]
    ListenerPanicked(String),
}

impl FieldError {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldError::UnknownField(_) => "unknown_field",
            FieldError::Read(_) => "read_failed",
            FieldError::ListenerPanicked(_) => "listener_panicked",
        }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
