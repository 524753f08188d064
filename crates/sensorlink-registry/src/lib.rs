//! Name and address resolution for sensorlink.
//!
//! Turns what arrives over the air into what the local sensor framework
//! understands:
//! - [`TypeTable`] maps short field names (`"t"`) to [`SensorType`]s
//! - [`NodeTable`] maps receive channels to sensor node addresses
//! - [`SensorManager`] holds the virtual sensor registered for each node and
//!   invokes its listeners on every read
//!
//! Tables are built once at startup, optionally from a JSON [`TableConfig`],
//! and are read-only afterwards.

pub mod config;
pub mod custom;
pub mod error;
pub mod nodes;
pub mod sensor;
pub mod sensor_type;
pub mod types;

pub use config::{SensorConfig, TableConfig};
pub use custom::TemperatureRawData;
pub use error::{ReadError, RegistryError, Result, UnknownFieldError, UnknownNodeError};
pub use nodes::{NodeAddress, NodeTable};
pub use sensor::{Listener, SensorFramework, SensorHandle, SensorManager, SensorReading};
pub use sensor_type::{SensorType, SensorTypeMask, UserSlot, USER_DEFINED_SLOTS};
pub use types::TypeTable;
