use sensorlink_registry::SensorType;

use crate::error::FieldError;

/// Result of dispatching one decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub name: String,
    /// Resolved type; `None` when the name is not mapped.
    pub sensor_type: Option<SensorType>,
    pub result: Result<(), FieldError>,
}

impl FieldOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-field results of one frame, in decode order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    fields: Vec<FieldOutcome>,
}

impl DispatchOutcome {
    pub(crate) fn push(&mut self, outcome: FieldOutcome) {
        self.fields.push(outcome);
    }

    pub fn fields(&self) -> &[FieldOutcome] {
        &self.fields
    }

    /// Fields delivered to the sensor framework.
    pub fn dispatched(&self) -> usize {
        self.fields.iter().filter(|f| f.is_ok()).count()
    }

    /// Fields skipped because of an error.
    pub fn failed(&self) -> usize {
        self.total() - self.dispatched()
    }

    pub fn total(&self) -> usize {
        self.fields.len()
    }

    /// Errors of the skipped fields, in decode order.
    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.fields.iter().filter_map(|f| f.result.as_ref().err())
    }
}
