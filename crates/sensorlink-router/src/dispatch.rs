use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use sensorlink_frame::{reclaim, DecoderConfig, FieldValue, PayloadDecoder};
use sensorlink_registry::{
    NodeAddress, SensorFramework, SensorHandle, SensorType, TypeTable, UnknownNodeError,
};
use tracing::debug;

use crate::error::{DispatchError, FieldError};
use crate::outcome::{DispatchOutcome, FieldOutcome};

/// Turns one received frame into sensor reads.
///
/// Reads are synchronous: each field's listeners finish before the next
/// field is looked at.
pub struct Dispatcher {
    types: Arc<TypeTable>,
    sensors: Arc<dyn SensorFramework>,
    decoder: PayloadDecoder,
}

impl Dispatcher {
    pub fn new(
        types: Arc<TypeTable>,
        sensors: Arc<dyn SensorFramework>,
        decoder: DecoderConfig,
    ) -> Self {
        Self {
            types,
            sensors,
            decoder: PayloadDecoder::new(decoder),
        }
    }

    /// Dispatch every field of `frame`, sent by `node`.
    ///
    /// `frame` is reclaimed in place. The whole frame is dropped when the node
    /// has no sensor or the payload does not decode; otherwise each field is
    /// dispatched independently and failures are recorded per field. A
    /// listener that panics fails only its own field.
    pub fn dispatch(
        &self,
        node: &NodeAddress,
        frame: &mut [u8],
    ) -> Result<DispatchOutcome, DispatchError> {
        let payload = reclaim(frame);

        let sensor = self
            .sensors
            .find_sensor(node)
            .ok_or_else(|| UnknownNodeError {
                address: node.clone(),
            })?;

        // Released when this function returns, whichever way it returns.
        let decoded = self.decoder.decode(payload)?;
        debug!(%node, len = payload.len(), fields = decoded.len(), "payload decoded");

        let mut outcome = DispatchOutcome::default();
        for field in &decoded {
            let resolved = self.types.resolve_type(&field.name);
            let sensor_type = resolved.as_ref().ok().copied();
            let result = resolved
                .map_err(FieldError::from)
                .and_then(|ty| self.read_field(&sensor, ty, &field.value));

            if let Err(err) = &result {
                debug!(%node, field = %field.name, kind = err.kind(), "field skipped");
            }
            outcome.push(FieldOutcome {
                name: field.name.clone(),
                sensor_type,
                result,
            });
        }
        Ok(outcome)
    }

    fn read_field(
        &self,
        sensor: &SensorHandle,
        sensor_type: SensorType,
        value: &FieldValue,
    ) -> Result<(), FieldError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.sensors.read(sensor, sensor_type, value)
        }))
        .map_err(|payload| FieldError::ListenerPanicked(panic_message(payload.as_ref())))?
        .map_err(FieldError::from)
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn decoder(&self) -> &PayloadDecoder {
        &self.decoder
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("types", &self.types)
            .field("decoder", &self.decoder.config())
            .finish()
    }
}
