//! Sensor type identifiers.
//!
//! Each type is one bit, so a set of types fits in a [`SensorTypeMask`].
//! Bits 0-17 are the framework's built-in types; bits 26-31 are reserved for
//! application-defined types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RegistryError;

/// Number of application-defined type slots.
pub const USER_DEFINED_SLOTS: u8 = 6;

const USER_DEFINED_SHIFT: u8 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorType {
    Accelerometer,
    MagneticField,
    Gyroscope,
    Light,
    Temperature,
    AmbientTemperature,
    Pressure,
    Proximity,
    RelativeHumidity,
    RotationVector,
    Altitude,
    Weight,
    LinearAccel,
    Gravity,
    Euler,
    Color,
    Voltage,
    Current,
    /// Application-defined type.
    User(UserSlot),
}

/// An application-defined type slot, always in `1..=USER_DEFINED_SLOTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserSlot(u8);

impl UserSlot {
    /// `None` outside `1..=6`.
    pub const fn new(slot: u8) -> Option<Self> {
        if slot >= 1 && slot <= USER_DEFINED_SLOTS {
            Some(UserSlot(slot))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

const BUILT_IN: [(SensorType, &str); 18] = [
    (SensorType::Accelerometer, "accelerometer"),
    (SensorType::MagneticField, "magnetic_field"),
    (SensorType::Gyroscope, "gyroscope"),
    (SensorType::Light, "light"),
    (SensorType::Temperature, "temperature"),
    (SensorType::AmbientTemperature, "ambient_temperature"),
    (SensorType::Pressure, "pressure"),
    (SensorType::Proximity, "proximity"),
    (SensorType::RelativeHumidity, "relative_humidity"),
    (SensorType::RotationVector, "rotation_vector"),
    (SensorType::Altitude, "altitude"),
    (SensorType::Weight, "weight"),
    (SensorType::LinearAccel, "linear_accel"),
    (SensorType::Gravity, "gravity"),
    (SensorType::Euler, "euler"),
    (SensorType::Color, "color"),
    (SensorType::Voltage, "voltage"),
    (SensorType::Current, "current"),
];

impl SensorType {
    /// Raw ambient temperature: the unconverted ADC reading sent by sensor
    /// nodes to keep messages small. Occupies the first user-defined slot.
    pub const AMBIENT_TEMPERATURE_RAW: SensorType = SensorType::User(UserSlot(1));

    /// Application-defined type in `slot`, or `None` outside `1..=6`.
    pub const fn user(slot: u8) -> Option<Self> {
        match UserSlot::new(slot) {
            Some(slot) => Some(SensorType::User(slot)),
            None => None,
        }
    }

    /// The type's bit.
    pub fn bits(self) -> u32 {
        match self {
            SensorType::User(slot) => 1 << (USER_DEFINED_SHIFT + slot.get() - 1),
            built_in => {
                let position = BUILT_IN
                    .iter()
                    .position(|(ty, _)| *ty == built_in)
                    .unwrap_or_default();
                1 << position
            }
        }
    }

    /// The type with exactly `bits` set, if any.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if !bits.is_power_of_two() {
            return None;
        }
        let position = bits.trailing_zeros() as u8;
        if let Some((ty, _)) = BUILT_IN.get(position as usize) {
            return Some(*ty);
        }
        position
            .checked_sub(USER_DEFINED_SHIFT)
            .and_then(|offset| SensorType::user(offset + 1))
    }

    /// Snake-case name used in configuration and output.
    pub fn name(self) -> String {
        match self {
            SensorType::AMBIENT_TEMPERATURE_RAW => "ambient_temperature_raw".to_string(),
            SensorType::User(slot) => format!("user_defined_{}", slot.get()),
            built_in => BUILT_IN
                .iter()
                .find(|(ty, _)| *ty == built_in)
                .map(|(_, name)| (*name).to_string())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for SensorType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower == "ambient_temperature_raw" {
            return Ok(SensorType::AMBIENT_TEMPERATURE_RAW);
        }
        if let Some((ty, _)) = BUILT_IN.iter().find(|(_, name)| *name == lower) {
            return Ok(*ty);
        }
        lower
            .strip_prefix("user_defined_")
            .and_then(|slot| slot.parse::<u8>().ok())
            .and_then(SensorType::user)
            .ok_or_else(|| RegistryError::UnknownSensorType(s.to_string()))
    }
}

impl Serialize for SensorType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for SensorType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A set of sensor types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SensorTypeMask(u32);

impl SensorTypeMask {
    pub const NONE: SensorTypeMask = SensorTypeMask(0);
    pub const ALL: SensorTypeMask = SensorTypeMask(u32::MAX);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, ty: SensorType) -> bool {
        self.0 & ty.bits() != 0
    }

    #[must_use]
    pub fn with(self, ty: SensorType) -> Self {
        Self(self.0 | ty.bits())
    }
}

impl FromIterator<SensorType> for SensorTypeMask {
    fn from_iter<I: IntoIterator<Item = SensorType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

impl From<SensorType> for SensorTypeMask {
    fn from(ty: SensorType) -> Self {
        Self(ty.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_bits_follow_framework_numbering() {
        assert_eq!(SensorType::Accelerometer.bits(), 1 << 0);
        assert_eq!(SensorType::AmbientTemperature.bits(), 1 << 5);
        assert_eq!(SensorType::RelativeHumidity.bits(), 1 << 8);
        assert_eq!(SensorType::Current.bits(), 1 << 17);
    }

    #[test]
    fn user_defined_bits_start_at_26() {
        assert_eq!(SensorType::AMBIENT_TEMPERATURE_RAW.bits(), 1 << 26);
        assert_eq!(SensorType::user(6).unwrap().bits(), 1 << 31);
        assert!(SensorType::user(0).is_none());
        assert!(SensorType::user(7).is_none());
        assert!(UserSlot::new(u8::MAX).is_none());
    }

    #[test]
    fn user_slots_have_distinct_bits() {
        let bits: Vec<u32> = (1..=USER_DEFINED_SLOTS)
            .filter_map(SensorType::user)
            .map(SensorType::bits)
            .collect();
        assert_eq!(bits.len(), USER_DEFINED_SLOTS as usize);
        for (i, bit) in bits.iter().enumerate() {
            assert_eq!(*bit, 1 << (26 + i));
        }

        let last: SensorTypeMask = SensorType::user(6).unwrap().into();
        assert!(!last.contains(SensorType::user(5).unwrap()));
    }

    #[test]
    fn bits_round_trip_for_every_type() {
        let all = BUILT_IN
            .iter()
            .map(|(ty, _)| *ty)
            .chain((1..=USER_DEFINED_SLOTS).filter_map(SensorType::user));
        for ty in all {
            assert_eq!(SensorType::from_bits(ty.bits()), Some(ty));
        }
        assert_eq!(SensorType::from_bits(0), None);
        assert_eq!(SensorType::from_bits(0b11), None);
        assert_eq!(SensorType::from_bits(1 << 20), None);
    }

    #[test]
    fn names_parse_back() {
        assert_eq!(
            "ambient_temperature_raw".parse::<SensorType>().unwrap(),
            SensorType::AMBIENT_TEMPERATURE_RAW
        );
        assert_eq!(
            "Relative_Humidity".parse::<SensorType>().unwrap(),
            SensorType::RelativeHumidity
        );
        assert_eq!(
            "user_defined_3".parse::<SensorType>().unwrap(),
            SensorType::user(3).unwrap()
        );
        assert!(matches!(
            "user_defined_9".parse::<SensorType>(),
            Err(RegistryError::UnknownSensorType(_))
        ));
        assert_eq!(SensorType::Pressure.to_string(), "pressure");
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&SensorType::AMBIENT_TEMPERATURE_RAW).unwrap();
        assert_eq!(json, r#""ambient_temperature_raw""#);
        let ty: SensorType = serde_json::from_str(r#""light""#).unwrap();
        assert_eq!(ty, SensorType::Light);
        assert!(serde_json::from_str::<SensorType>(r#""sonar""#).is_err());
    }

    #[test]
    fn mask_membership() {
        let mask: SensorTypeMask = [SensorType::Light, SensorType::AMBIENT_TEMPERATURE_RAW]
            .into_iter()
            .collect();
        assert!(mask.contains(SensorType::Light));
        assert!(mask.contains(SensorType::AMBIENT_TEMPERATURE_RAW));
        assert!(!mask.contains(SensorType::Pressure));
        assert!(SensorTypeMask::ALL.contains(SensorType::user(6).unwrap()));
        assert!(!SensorTypeMask::NONE.contains(SensorType::Light));
    }
}
