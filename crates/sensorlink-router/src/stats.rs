use std::sync::atomic::{AtomicU64, Ordering};

use sensorlink_frame::DecodeError;
use serde::Serialize;

use crate::error::{DispatchError, FieldError};
use crate::outcome::DispatchOutcome;

/// Running counters, updated from the interrupt callback and the drain worker.
#[derive(Debug, Default)]
pub struct RouterStats {
    interrupts: AtomicU64,
    cycles: AtomicU64,
    bound_exhausted: AtomicU64,
    frames_read: AtomicU64,
    frames_dispatched: AtomicU64,
    fields_dispatched: AtomicU64,
    read_errors: AtomicU64,
    transport_errors: AtomicU64,
    unassigned_channel: AtomicU64,
    unknown_node: AtomicU64,
    malformed: AtomicU64,
    out_of_resources: AtomicU64,
    unknown_field: AtomicU64,
    read_failed: AtomicU64,
    listener_panicked: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub interrupts: u64,
    pub cycles: u64,
    pub bound_exhausted: u64,
    pub frames_read: u64,
    pub frames_dispatched: u64,
    pub fields_dispatched: u64,
    pub read_errors: u64,
    pub transport_errors: u64,
    pub unassigned_channel: u64,
    pub unknown_node: u64,
    pub malformed: u64,
    pub out_of_resources: u64,
    pub unknown_field: u64,
    pub read_failed: u64,
    pub listener_panicked: u64,
}

impl StatsSnapshot {
    /// Frames dropped whole.
    pub fn frames_dropped(&self) -> u64 {
        self.unassigned_channel + self.unknown_node + self.malformed + self.out_of_resources
    }

    /// Fields skipped inside otherwise good frames.
    pub fn fields_skipped(&self) -> u64 {
        self.unknown_field + self.read_failed + self.listener_panicked
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_interrupt(&self) {
        bump(&self.interrupts);
    }

    pub(crate) fn record_cycle(&self, frames_read: usize, read_errors: usize, bound_exhausted: bool) {
        bump(&self.cycles);
        self.frames_read
            .fetch_add(frames_read as u64, Ordering::Relaxed);
        self.read_errors
            .fetch_add(read_errors as u64, Ordering::Relaxed);
        if bound_exhausted {
            bump(&self.bound_exhausted);
        }
    }

    pub(crate) fn record_transport_error(&self) {
        bump(&self.transport_errors);
    }

    pub(crate) fn record_frame(&self, result: &Result<DispatchOutcome, DispatchError>) {
        match result {
            Ok(outcome) => {
                bump(&self.frames_dispatched);
                self.fields_dispatched
                    .fetch_add(outcome.dispatched() as u64, Ordering::Relaxed);
                for err in outcome.errors() {
                    match err {
                        FieldError::UnknownField(_) => bump(&self.unknown_field),
                        FieldError::Read(_) => bump(&self.read_failed),
                        FieldError::ListenerPanicked(_) => bump(&self.listener_panicked),
                    }
                }
            }
            Err(DispatchError::UnassignedChannel(_)) => bump(&self.unassigned_channel),
            Err(DispatchError::UnknownNode(_)) => bump(&self.unknown_node),
            Err(DispatchError::Decode(err)) => match err {
                DecodeError::Malformed(_) => bump(&self.malformed),
                DecodeError::OutOfResources(_) => bump(&self.out_of_resources),
            },
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            interrupts: load(&self.interrupts),
            cycles: load(&self.cycles),
            bound_exhausted: load(&self.bound_exhausted),
            frames_read: load(&self.frames_read),
            frames_dispatched: load(&self.frames_dispatched),
            fields_dispatched: load(&self.fields_dispatched),
            read_errors: load(&self.read_errors),
            transport_errors: load(&self.transport_errors),
            unassigned_channel: load(&self.unassigned_channel),
            unknown_node: load(&self.unknown_node),
            malformed: load(&self.malformed),
            out_of_resources: load(&self.out_of_resources),
            unknown_field: load(&self.unknown_field),
            read_failed: load(&self.read_failed),
            listener_panicked: load(&self.listener_panicked),
        }
    }
}
