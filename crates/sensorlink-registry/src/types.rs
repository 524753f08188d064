use std::collections::HashMap;

use crate::error::{RegistryError, Result, UnknownFieldError};
use crate::sensor_type::SensorType;

/// Longest accepted field name. Names travel in every frame, so they are
/// kept to a few characters.
pub const MAX_FIELD_NAME_LEN: usize = 8;

/// Field names mapped by [`TypeTable::with_defaults`].
pub const DEFAULT_FIELDS: [(&str, SensorType); 5] = [
    ("t", SensorType::AMBIENT_TEMPERATURE_RAW),
    ("tmp", SensorType::AmbientTemperature),
    ("hum", SensorType::RelativeHumidity),
    ("prs", SensorType::Pressure),
    ("lux", SensorType::Light),
];

/// Mapping from field names to sensor types.
///
/// Built once at startup and read-only afterwards; share it behind an `Arc`
/// and resolve from any thread without locking.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<String, SensorType>,
}

impl TypeTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding [`DEFAULT_FIELDS`].
    pub fn with_defaults() -> Self {
        let types = DEFAULT_FIELDS
            .iter()
            .map(|(name, ty)| ((*name).to_string(), *ty))
            .collect();
        Self { types }
    }

    /// Map `name` to `ty`.
    pub fn register(&mut self, name: &str, ty: SensorType) -> Result<()> {
        if name.is_empty() || name.len() > MAX_FIELD_NAME_LEN || !name.is_ascii() {
            return Err(RegistryError::InvalidFieldName(name.to_string()));
        }
        if self.types.contains_key(name) {
            return Err(RegistryError::DuplicateField(name.to_string()));
        }
        self.types.insert(name.to_string(), ty);
        Ok(())
    }

    /// Map `name` to `ty`, replacing any existing mapping.
    pub fn set(&mut self, name: &str, ty: SensorType) -> Result<()> {
        self.types.remove(name);
        self.register(name, ty)
    }

    /// Sensor type for a decoded field name.
    pub fn resolve_type(&self, name: &str) -> std::result::Result<SensorType, UnknownFieldError> {
        self.types
            .get(name)
            .copied()
            .ok_or_else(|| UnknownFieldError {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Mappings sorted by field name.
    pub fn entries(&self) -> Vec<(&str, SensorType)> {
        let mut entries: Vec<_> = self
            .types
            .iter()
            .map(|(name, ty)| (name.as_str(), *ty))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
