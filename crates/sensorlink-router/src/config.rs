use sensorlink_frame::DecoderConfig;
use sensorlink_radio::DEFAULT_DEVICE_NAME;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scheduler::MAX_DRAIN_STEPS;

/// What this node does on the radio network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Receives frames from sensor nodes and dispatches them.
    #[default]
    Collector,
    /// Only transmits; the router never starts.
    Sensor,
}

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    pub role: NodeRole,
    /// Name of the radio device to open.
    pub device_name: String,
    /// Scheduler steps allowed per interrupt, capped at [`MAX_DRAIN_STEPS`].
    pub drain_bound: usize,
    pub decoder: DecoderConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            role: NodeRole::Collector,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            drain_bound: MAX_DRAIN_STEPS,
            decoder: DecoderConfig::default(),
        }
    }
}

impl RouterConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Default settings for a transmit-only node.
    pub fn sensor() -> Self {
        Self {
            role: NodeRole::Sensor,
            ..Self::default()
        }
    }
}
