use crate::nodes::NodeAddress;
use crate::sensor_type::SensorType;

/// A decoded field name with no registered sensor type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field name {name:?}")]
pub struct UnknownFieldError {
    pub name: String,
}

/// A node address with no registered virtual sensor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no sensor registered for node {address}")]
pub struct UnknownNodeError {
    pub address: NodeAddress,
}

/// Errors returned by a sensor read dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// The sensor does not produce this type.
    #[error("sensor {address} does not support {sensor_type}")]
    Unsupported {
        address: NodeAddress,
        sensor_type: SensorType,
    },

    /// The handle refers to a sensor that is no longer registered.
    #[error("sensor {0} is not registered")]
    NotRegistered(NodeAddress),

    /// The value does not have the shape this type requires.
    #[error("{sensor_type} cannot carry a {found} value")]
    InvalidValue {
        sensor_type: SensorType,
        found: &'static str,
    },
}

/// Errors that can occur while building registry tables.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The configuration file could not be loaded.
    #[error("failed to load table config: {0}")]
    LoadFailed(String),

    /// The configuration is not valid JSON for the expected shape.
    #[error("table config is not valid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A node address is not 3 to 5 bytes of hex.
    #[error("invalid node address {0:?}")]
    InvalidAddress(String),

    /// A field name is empty, too long, or not ASCII.
    #[error("invalid field name {0:?}")]
    InvalidFieldName(String),

    /// A field name is mapped twice.
    #[error("field name {0:?} is already mapped")]
    DuplicateField(String),

    /// A virtual sensor is registered twice for one node.
    #[error("a sensor is already registered for node {0}")]
    DuplicateSensor(NodeAddress),

    /// A sensor type name is not known.
    #[error("unknown sensor type {0:?}")]
    UnknownSensorType(String),

    /// More node addresses than receive channels.
    #[error("{count} node addresses configured, at most {max} channels")]
    TooManyNodes { count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
