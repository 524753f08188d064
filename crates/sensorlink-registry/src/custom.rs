use sensorlink_frame::FieldValue;
use serde::Serialize;

use crate::sensor_type::SensorType;

/// One raw ambient temperature reading.
///
/// Nodes send the unconverted 12-bit ADC value; conversion to degrees
/// happens on the server. `is_valid` is false when the value falls outside
/// the ADC range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemperatureRawData {
    pub raw: u32,
    pub is_valid: bool,
}

impl TemperatureRawData {
    /// Largest value the ADC produces.
    pub const MAX_RAW: u32 = 4095;

    pub const SENSOR_TYPE: SensorType = SensorType::AMBIENT_TEMPERATURE_RAW;

    pub fn new(raw: u32) -> Self {
        Self {
            raw,
            is_valid: raw <= Self::MAX_RAW,
        }
    }

    /// Interpret a decoded field value. `None` for non-integers.
    pub fn from_value(value: &FieldValue) -> Option<Self> {
        let raw = value.as_i64()?;
        Some(match u32::try_from(raw) {
            Ok(raw) => Self::new(raw),
            Err(_) => Self {
                raw: 0,
                is_valid: false,
            },
        })
    }
}
