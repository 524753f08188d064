//! Message router from nRF24-style radio frames to local virtual sensors.
//!
//! Remote battery-powered nodes send fixed 32-byte frames holding a small
//! CBOR map such as `{"t": 2731}`. sensorlink drains the radio on every
//! receive interrupt, strips padding and the sequence byte, decodes the map,
//! and turns every field into a sensor read on the node's virtual sensor.
//!
//! # Crate Structure
//!
//! - [`radio`]: channel ids, transceiver trait, exclusive device handle, simulated radio
//! - [`frame`]: frame reclaim, frame builder, payload decoder
//! - [`registry`]: sensor types, field and node tables, virtual sensors
//! - [`router`]: dispatch loop, drain scheduler, router lifecycle (behind `router` feature)

/// Re-export radio types.
pub mod radio {
    pub use sensorlink_radio::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sensorlink_frame::*;
}

/// Re-export registry types.
pub mod registry {
    pub use sensorlink_registry::*;
}

/// Re-export router types (requires `router` feature).
#[cfg(feature = "router")]
pub mod router {
    pub use sensorlink_router::*;
}
