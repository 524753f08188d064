use std::sync::Arc;

use crate::channel::ChannelId;
use crate::error::Result;

/// Callback invoked from the transceiver's receive interrupt.
///
/// Runs in interrupt context on real hardware, so implementations only post
/// work somewhere else and return.
pub type ReceiveCallback = Arc<dyn Fn() + Send + Sync>;

/// A multi-pipe radio transceiver driver.
///
/// Every method is non-blocking. Exclusive access is provided by
/// [`RadioDevice`](crate::RadioDevice), never by the driver itself.
pub trait Transceiver: Send {
    /// Install the callback fired when any receive channel gets data.
    fn set_receive_callback(&mut self, callback: ReceiveCallback) -> Result<()>;

    /// Lowest-numbered channel that currently has data waiting, if any.
    fn readable_channel(&mut self) -> Result<Option<ChannelId>>;

    /// Whether `channel` currently has data waiting.
    fn is_readable(&mut self, channel: ChannelId) -> Result<bool>;

    /// Read one frame from `channel` into `buf`, returning the bytes read.
    fn receive(&mut self, channel: ChannelId, buf: &mut [u8]) -> Result<usize>;
}

impl<T: Transceiver + ?Sized> Transceiver for Box<T> {
    fn set_receive_callback(&mut self, callback: ReceiveCallback) -> Result<()> {
        (**self).set_receive_callback(callback)
    }

    fn readable_channel(&mut self) -> Result<Option<ChannelId>> {
        (**self).readable_channel()
    }

    fn is_readable(&mut self, channel: ChannelId) -> Result<bool> {
        (**self).is_readable(channel)
    }

    fn receive(&mut self, channel: ChannelId, buf: &mut [u8]) -> Result<usize> {
        (**self).receive(channel, buf)
    }
}
