use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::nodes::{NodeAddress, NodeTable};
use crate::sensor::SensorManager;
use crate::sensor_type::{SensorType, SensorTypeMask};
use crate::types::TypeTable;

/// Largest table config file accepted by [`TableConfig::from_file`].
pub const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;

/// Virtual sensor to register for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub address: NodeAddress,
    /// Types the sensor produces. Empty means every type.
    #[serde(default)]
    pub types: Vec<SensorType>,
}

impl SensorConfig {
    pub fn mask(&self) -> SensorTypeMask {
        if self.types.is_empty() {
            SensorTypeMask::ALL
        } else {
            self.types.iter().copied().collect()
        }
    }
}

/// Startup tables in one JSON document:
///
/// ```json
/// {
///   "nodes": ["b3b4b5b6f1", "b3b4b5b6cd"],
///   "fields": { "v": "voltage" },
///   "sensors": [{ "address": "b3b4b5b6f1", "types": ["ambient_temperature_raw"] }]
/// }
/// ```
///
/// `fields` extends the default field names unless `default_fields` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub nodes: Vec<NodeAddress>,
    pub default_fields: bool,
    pub fields: BTreeMap<String, SensorType>,
    pub sensors: Vec<SensorConfig>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            default_fields: true,
            fields: BTreeMap::new(),
            sensors: Vec::new(),
        }
    }
}

impl TableConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file no larger than [`MAX_CONFIG_FILE_SIZE`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| RegistryError::LoadFailed(format!("{}: {err}", path.display())))?;
        let metadata = file
            .metadata()
            .map_err(|err| RegistryError::LoadFailed(err.to_string()))?;
        if !metadata.is_file() {
            return Err(RegistryError::LoadFailed(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        if metadata.len() > MAX_CONFIG_FILE_SIZE as u64 {
            return Err(RegistryError::LoadFailed(format!(
                "table config too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }

        let read_limit = u64::try_from(MAX_CONFIG_FILE_SIZE.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                RegistryError::LoadFailed(format!("failed reading {}: {err}", path.display()))
            })?;
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(RegistryError::LoadFailed(format!(
                "table config too large while reading: {}",
                path.display()
            )));
        }

        debug!(path = %path.display(), bytes = content.len(), "table config loaded");
        Self::from_json(&content)
    }

    pub fn type_table(&self) -> Result<TypeTable> {
        let mut table = if self.default_fields {
            TypeTable::with_defaults()
        } else {
            TypeTable::new()
        };
        for (name, ty) in &self.fields {
            table.set(name, *ty)?;
        }
        Ok(table)
    }

    pub fn node_table(&self) -> Result<NodeTable> {
        NodeTable::from_addresses(&self.nodes)
    }

    /// A manager with one virtual sensor per entry in `sensors`.
    pub fn sensor_manager(&self) -> Result<SensorManager> {
        let manager = SensorManager::new();
        for sensor in &self.sensors {
            manager.register_sensor(sensor.address.clone(), sensor.mask())?;
        }
        Ok(manager)
    }
}
