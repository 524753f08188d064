//! Radio transceiver boundary for sensorlink.
//!
//! The collector node receives fixed-size frames from remote sensor nodes
//! over a multi-pipe transceiver (nRF24L01 style). This crate describes that
//! driver at its interface boundary:
//! - [`ChannelId`] numbers the receive pipes (1-based)
//! - [`Transceiver`] is the driver contract (poll, receive, interrupt callback)
//! - [`RadioDevice`] owns the single long-lived device handle and hands out
//!   exclusive [`RadioGuard`]s
//! - [`SimRadio`] is an in-memory transceiver for tests and tooling
//!
//! This is the lowest layer of sensorlink. Everything else builds on top of
//! the types provided here.

pub mod channel;
pub mod device;
pub mod error;
pub mod sim;
pub mod traits;

pub use channel::{ChannelId, FRAME_SIZE, MAX_CHANNELS};
pub use device::{RadioDevice, RadioGuard, DEFAULT_DEVICE_NAME};
pub use error::{RadioError, Result};
pub use sim::SimRadio;
pub use traits::{ReceiveCallback, Transceiver};
