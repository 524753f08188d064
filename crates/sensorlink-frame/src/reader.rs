use sensorlink_radio::{ChannelId, RadioError, Transceiver, FRAME_SIZE};
use tracing::trace;

use crate::codec::RadioFrame;

/// Read one frame from `channel`.
///
/// The caller holds the radio exclusively for the duration of the call. A
/// read of zero bytes or of more than [`FRAME_SIZE`] bytes is a transport
/// error; short frames are accepted as-is.
pub fn receive_frame<T: Transceiver + ?Sized>(
    radio: &mut T,
    channel: ChannelId,
) -> Result<RadioFrame, RadioError> {
    let mut buf = [0u8; FRAME_SIZE];
    let len = radio.receive(channel, &mut buf)?;

    if len == 0 {
        return Err(RadioError::EmptyRead { channel });
    }
    if len > FRAME_SIZE {
        return Err(RadioError::Oversized {
            channel,
            len,
            max: FRAME_SIZE,
        });
    }

    trace!(%channel, len, "frame received");
    RadioFrame::new(channel, &buf[..len]).map_err(|_| RadioError::Oversized {
        channel,
        len,
        max: FRAME_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use sensorlink_radio::{ReceiveCallback, SimRadio};

    use super::*;
    use crate::writer::FrameWriter;

    #[test]
    fn reads_full_frame() {
        let mut radio = SimRadio::new();
        let mut writer = FrameWriter::new();
        let sent = writer.build(&[0xA0]).unwrap();
        radio.push_frame(ChannelId::FIRST, sent.to_vec());

        let frame = receive_frame(&mut radio, ChannelId::FIRST).unwrap();
        assert_eq!(frame.channel(), ChannelId::FIRST);
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(frame.as_bytes(), sent.as_slice());
    }

    #[test]
    fn empty_read_is_error() {
        let mut radio = SimRadio::new();
        let err = receive_frame(&mut radio, ChannelId::LAST).unwrap_err();
        assert!(matches!(err, RadioError::EmptyRead { channel } if channel == ChannelId::LAST));
    }

    #[test]
    fn driver_error_propagates() {
        let mut radio = SimRadio::new();
        radio.push_frame(ChannelId::FIRST, vec![1]);
        radio.fail_receives(ChannelId::FIRST, 1);
        assert!(matches!(
            receive_frame(&mut radio, ChannelId::FIRST),
            Err(RadioError::Receive { .. })
        ));
    }

    struct LyingDriver;

    impl Transceiver for LyingDriver {
        fn set_receive_callback(&mut self, _: ReceiveCallback) -> sensorlink_radio::Result<()> {
            Ok(())
        }

        fn readable_channel(&mut self) -> sensorlink_radio::Result<Option<ChannelId>> {
            Ok(Some(ChannelId::FIRST))
        }

        fn is_readable(&mut self, _: ChannelId) -> sensorlink_radio::Result<bool> {
            Ok(true)
        }

        fn receive(&mut self, _: ChannelId, _: &mut [u8]) -> sensorlink_radio::Result<usize> {
            Ok(FRAME_SIZE + 8)
        }
    }

    #[test]
    fn oversized_read_is_error() {
        let err = receive_frame(&mut LyingDriver, ChannelId::FIRST).unwrap_err();
        assert!(matches!(err, RadioError::Oversized { len, .. } if len == FRAME_SIZE + 8));
    }
}
