//! Drain scheduler.
//!
//! One interrupt runs one drain cycle:
//!
//! ```text
//!   Idle ──interrupt──▶ Scanning(1) ──data──▶ Draining(1) ──▶ Scanning(2) ...
//!                           │no data
//!                           ▼
//!                      Scanning(i+1), or Idle once the step bound is spent
//!                      or a full pass found nothing
//! ```
//!
//! Channels are visited round-robin in ascending order. A channel that had
//! data is not re-checked until every other channel has been scanned. Each
//! scan step counts against the bound, so a channel that is always ready
//! cannot keep the cycle going.
//!
//! The radio is held for the scan and reads only. Frames are kept in a fixed
//! batch and dispatched after the handle is released, so listeners never run
//! while the radio is locked.

use heapless::Vec as BoundedVec;
use sensorlink_frame::{receive_frame, RadioFrame};
use sensorlink_radio::{ChannelId, RadioDevice, RadioError, Transceiver, MAX_CHANNELS};
use sensorlink_registry::{NodeAddress, NodeTable};
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::outcome::{DispatchOutcome, FieldOutcome};

/// Most scan steps one cycle may take.
pub const MAX_DRAIN_STEPS: usize = 2 * MAX_CHANNELS as usize;

type FrameBatch = BoundedVec<RadioFrame, MAX_DRAIN_STEPS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainState {
    #[default]
    Idle,
    Scanning(ChannelId),
    Draining(ChannelId),
}

/// One frame read during a cycle and what became of it.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub channel: ChannelId,
    pub node: Option<NodeAddress>,
    pub sequence: Option<u8>,
    pub result: Result<DispatchOutcome, DispatchError>,
}

impl FrameReport {
    /// Fields of a dispatched frame that were not delivered.
    pub fn skipped_fields(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.result
            .iter()
            .flat_map(|outcome| outcome.fields())
            .filter(|field| field.result.is_err())
    }
}

/// Summary of one drain cycle.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Scan steps taken.
    pub steps: usize,
    /// Frames read, in scan order.
    pub frames: Vec<FrameReport>,
    /// Receives that failed on a single channel.
    pub read_errors: usize,
    /// Error that ended the scan early.
    pub transport_error: Option<RadioError>,
    /// The cycle stopped because the step bound was spent.
    pub bound_exhausted: bool,
}

impl DrainReport {
    pub fn frames_read(&self) -> usize {
        self.frames.len()
    }

    /// Fields delivered to the sensor framework across all frames.
    pub fn fields_dispatched(&self) -> usize {
        self.frames
            .iter()
            .filter_map(|frame| frame.result.as_ref().ok())
            .map(DispatchOutcome::dispatched)
            .sum()
    }

    /// Frames dropped whole.
    pub fn frames_dropped(&self) -> usize {
        self.frames.iter().filter(|frame| frame.result.is_err()).count()
    }
}

#[derive(Default)]
struct Scan {
    batch: FrameBatch,
    steps: usize,
    read_errors: usize,
    transport_error: Option<RadioError>,
    bound_exhausted: bool,
}

#[derive(Debug)]
pub struct DrainScheduler {
    bound: usize,
    state: DrainState,
}

impl Default for DrainScheduler {
    fn default() -> Self {
        Self::new(MAX_DRAIN_STEPS)
    }
}

impl DrainScheduler {
    /// `bound` is clamped to `1..=MAX_DRAIN_STEPS`.
    pub fn new(bound: usize) -> Self {
        Self {
            bound: bound.clamp(1, MAX_DRAIN_STEPS),
            state: DrainState::Idle,
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Current state; `Idle` between cycles.
    pub fn state(&self) -> DrainState {
        self.state
    }

    /// Run one cycle: scan and read under the radio handle, then dispatch.
    pub fn run_cycle<T: Transceiver>(
        &mut self,
        device: &RadioDevice<T>,
        nodes: &NodeTable,
        dispatcher: &Dispatcher,
    ) -> DrainReport {
        let scan = match device.open() {
            Ok(mut radio) => self.scan(&mut *radio),
            Err(err) => Scan {
                transport_error: Some(err),
                ..Scan::default()
            },
        };
        if let Some(err) = &scan.transport_error {
            warn!(device = device.name(), error = %err, kind = "transport", "drain cycle aborted");
        }

        let mut report = DrainReport {
            steps: scan.steps,
            frames: Vec::with_capacity(scan.batch.len()),
            read_errors: scan.read_errors,
            transport_error: scan.transport_error,
            bound_exhausted: scan.bound_exhausted,
        };
        for mut frame in scan.batch {
            report.frames.push(dispatch_frame(&mut frame, nodes, dispatcher));
        }

        debug!(
            steps = report.steps,
            frames = report.frames_read(),
            fields = report.fields_dispatched(),
            bound_exhausted = report.bound_exhausted,
            "drain cycle complete"
        );
        report
    }

    fn scan<T: Transceiver + ?Sized>(&mut self, radio: &mut T) -> Scan {
        let mut scan = Scan::default();
        let mut empty_run = 0usize;
        self.state = DrainState::Scanning(ChannelId::FIRST);

        loop {
            self.state = match self.state {
                DrainState::Idle => break,
                DrainState::Scanning(channel) => {
                    scan.steps += 1;
                    match radio.is_readable(channel) {
                        Ok(true) => {
                            empty_run = 0;
                            DrainState::Draining(channel)
                        }
                        Ok(false) => {
                            empty_run += 1;
                            if empty_run >= MAX_CHANNELS as usize {
                                DrainState::Idle
                            } else {
                                self.after_step(channel, &mut scan)
                            }
                        }
                        Err(err) => {
                            scan.transport_error = Some(err);
                            DrainState::Idle
                        }
                    }
                }
                DrainState::Draining(channel) => {
                    match receive_frame(radio, channel) {
                        Ok(frame) => {
                            if scan.batch.push(frame).is_err() {
                                warn!(%channel, "drain batch full, frame dropped");
                            }
                        }
                        Err(err) => {
                            scan.read_errors += 1;
                            warn!(%channel, error = %err, kind = "read", "frame read failed");
                        }
                    }
                    self.after_step(channel, &mut scan)
                }
            };
        }
        scan
    }

    fn after_step(&self, channel: ChannelId, scan: &mut Scan) -> DrainState {
        if scan.steps >= self.bound {
            scan.bound_exhausted = true;
            DrainState::Idle
        } else {
            DrainState::Scanning(channel.next_wrapping())
        }
    }
}

fn dispatch_frame(frame: &mut RadioFrame, nodes: &NodeTable, dispatcher: &Dispatcher) -> FrameReport {
    let channel = frame.channel();
    let sequence = frame.sequence();
    let node = nodes.node_address(channel).cloned();

    let result = match &node {
        Some(address) => dispatcher.dispatch(address, frame.as_bytes_mut()),
        None => Err(DispatchError::UnassignedChannel(channel)),
    };
    let report = FrameReport {
        channel,
        node,
        sequence,
        result,
    };
    log_frame(&report);
    report
}

fn log_frame(report: &FrameReport) {
    let channel = report.channel;
    let node = report.node.as_ref().map_or("-", NodeAddress::as_str);
    if let Err(err) = &report.result {
        warn!(%channel, node, kind = err.kind(), error = %err, "frame dropped");
    }
    for field in report.skipped_fields() {
        if let Err(err) = &field.result {
            warn!(
                %channel,
                node,
                field = %field.name,
                kind = err.kind(),
                error = %err,
                "field skipped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use sensorlink_frame::{DecoderConfig, Field, FrameWriter};
    use sensorlink_radio::{ReceiveCallback, SimRadio};
    use sensorlink_registry::{
        Listener, SensorManager, SensorTypeMask, TypeTable, UnknownNodeError,
    };

    use super::*;

    const ADDRESSES: [&str; 5] = [
        "b3b4b5b6f1",
        "b3b4b5b6cd",
        "b3b4b5b6a3",
        "b3b4b5b60f",
        "b3b4b5b605",
    ];

    fn ch(n: u8) -> ChannelId {
        ChannelId::new(n).unwrap()
    }

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s).unwrap()
    }

    fn temperature_frame(raw: i64) -> Vec<u8> {
        FrameWriter::new()
            .build_fields(&[Field::new("t", raw)])
            .unwrap()
            .to_vec()
    }

    /// Sensors for every address except those in `skip`.
    fn dispatcher(skip: &[&str]) -> (Dispatcher, Arc<SensorManager>) {
        let manager = Arc::new(SensorManager::new());
        for address in ADDRESSES.iter().filter(|a| !skip.contains(*a)) {
            manager
                .register_sensor(addr(address), SensorTypeMask::ALL)
                .unwrap();
        }
        let dispatcher = Dispatcher::new(
            Arc::new(TypeTable::with_defaults()),
            manager.clone(),
            DecoderConfig::default(),
        );
        (dispatcher, manager)
    }

    fn all_nodes() -> NodeTable {
        NodeTable::from_addresses(&ADDRESSES).unwrap()
    }

    #[test]
    fn starts_and_ends_idle() {
        let device = RadioDevice::new("sim", SimRadio::new());
        let (dispatcher, _) = dispatcher(&[]);
        let mut scheduler = DrainScheduler::default();
        assert_eq!(scheduler.state(), DrainState::Idle);

        let report = scheduler.run_cycle(&device, &all_nodes(), &dispatcher);

        assert_eq!(scheduler.state(), DrainState::Idle);
        assert_eq!(report.steps, MAX_CHANNELS as usize);
        assert_eq!(report.frames_read(), 0);
        assert!(!report.bound_exhausted);
    }

    #[test]
    fn always_ready_channels_are_bounded() {
        let radio = SimRadio::new();
        for channel in ChannelId::all() {
            radio.set_stuck(channel, temperature_frame(2000));
        }
        let device = RadioDevice::new("sim", radio.clone());
        let (dispatcher, _) = dispatcher(&[]);
        let mut scheduler = DrainScheduler::default();

        let report = scheduler.run_cycle(&device, &all_nodes(), &dispatcher);

        assert_eq!(radio.receive_count(), 10);
        assert_eq!(report.frames_read(), 10);
        assert_eq!(report.fields_dispatched(), 10);
        assert!(report.bound_exhausted);
        assert_eq!(scheduler.state(), DrainState::Idle);

        // Round-robin: each channel served twice, in ascending order.
        let channels: Vec<u8> = report.frames.iter().map(|f| f.channel.get()).collect();
        assert_eq!(channels, vec![1, 2, 3, 4, 5, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn smaller_bound_is_respected() {
        let radio = SimRadio::new();
        radio.set_stuck(ch(1), temperature_frame(1));
        let device = RadioDevice::new("sim", radio.clone());
        let (dispatcher, _) = dispatcher(&[]);

        let report = DrainScheduler::new(3).run_cycle(&device, &all_nodes(), &dispatcher);

        assert_eq!(report.steps, 3);
        assert_eq!(radio.receive_count(), 1);
        assert!(report.bound_exhausted);
        assert_eq!(DrainScheduler::new(0).bound(), 1);
        assert_eq!(DrainScheduler::new(50).bound(), MAX_DRAIN_STEPS);
    }

    #[test]
    fn skipped_fields_keep_their_channel() {
        let radio = SimRadio::new();
        let frame = FrameWriter::new()
            .build_fields(&[Field::new("zz", 5), Field::new("t", 100)])
            .unwrap();
        radio.push_frame(ch(2), frame.to_vec());
        let device = RadioDevice::new("sim", radio);
        let (dispatcher, _) = dispatcher(&[]);

        let report = DrainScheduler::default().run_cycle(&device, &all_nodes(), &dispatcher);

        let frame = &report.frames[0];
        assert_eq!(frame.channel, ch(2));
        assert_eq!(frame.node, Some(addr(ADDRESSES[1])));
        let skipped: Vec<(&str, &'static str)> = frame
            .skipped_fields()
            .filter_map(|field| Some((field.name.as_str(), field.result.as_ref().err()?.kind())))
            .collect();
        assert_eq!(skipped, vec![("zz", "unknown_field")]);
        assert_eq!(report.fields_dispatched(), 1);
    }

    #[test]
    fn busy_channel_waits_for_next_pass() {
        let radio = SimRadio::new();
        radio.push_frame(ch(1), temperature_frame(1));
        radio.push_frame(ch(1), temperature_frame(2));
        radio.push_frame(ch(3), temperature_frame(3));
        let device = RadioDevice::new("sim", radio.clone());
        let (dispatcher, _) = dispatcher(&[]);

        let report = DrainScheduler::default().run_cycle(&device, &all_nodes(), &dispatcher);

        let channels: Vec<u8> = report.frames.iter().map(|f| f.channel.get()).collect();
        assert_eq!(channels, vec![1, 3, 1]);
        assert_eq!(radio.pending_total(), 0);
    }

    #[test]
    fn unknown_node_does_not_affect_other_channels() {
        let radio = SimRadio::new();
        radio.push_frame(ch(1), temperature_frame(100));
        radio.push_frame(ch(2), temperature_frame(200));
        let device = RadioDevice::new("sim", radio);
        let (dispatcher, manager) = dispatcher(&[ADDRESSES[0]]);

        let report = DrainScheduler::default().run_cycle(&device, &all_nodes(), &dispatcher);

        assert_eq!(report.frames_read(), 2);
        assert_eq!(
            report.frames[0].result,
            Err(DispatchError::UnknownNode(UnknownNodeError {
                address: addr(ADDRESSES[0])
            }))
        );
        assert_eq!(report.frames[1].result.as_ref().unwrap().dispatched(), 1);
        assert_eq!(report.fields_dispatched(), 1);
        assert_eq!(report.frames_dropped(), 1);
        assert_eq!(manager.read_count(&addr(ADDRESSES[1])), 1);
    }

    #[test]
    fn unassigned_channel_is_dropped() {
        let radio = SimRadio::new();
        radio.push_frame(ch(4), temperature_frame(1));
        let device = RadioDevice::new("sim", radio);
        let (dispatcher, _) = dispatcher(&[]);
        let nodes = NodeTable::from_addresses(&ADDRESSES[..2]).unwrap();

        let report = DrainScheduler::default().run_cycle(&device, &nodes, &dispatcher);

        assert_eq!(report.frames[0].node, None);
        assert_eq!(
            report.frames[0].result,
            Err(DispatchError::UnassignedChannel(ch(4)))
        );
    }

    #[test]
    fn read_failure_does_not_halt_scan() {
        let radio = SimRadio::new();
        radio.push_frame(ch(1), temperature_frame(1));
        radio.push_frame(ch(2), temperature_frame(2));
        radio.fail_receives(ch(1), 1);
        let device = RadioDevice::new("sim", radio.clone());
        let (dispatcher, _) = dispatcher(&[]);

        let report = DrainScheduler::default().run_cycle(&device, &all_nodes(), &dispatcher);

        assert_eq!(report.read_errors, 1);
        assert!(report.transport_error.is_none());
        // Channel 1 is retried on the second pass.
        let channels: Vec<u8> = report.frames.iter().map(|f| f.channel.get()).collect();
        assert_eq!(channels, vec![2, 1]);
        assert_eq!(radio.pending_total(), 0);
    }

    #[test]
    fn frame_sequence_is_reported() {
        let radio = SimRadio::new();
        let frame = FrameWriter::with_sequence(42)
            .build_fields(&[Field::new("t", 5)])
            .unwrap();
        radio.push_frame(ch(1), frame.to_vec());
        let device = RadioDevice::new("sim", radio);
        let (dispatcher, _) = dispatcher(&[]);

        let report = DrainScheduler::default().run_cycle(&device, &all_nodes(), &dispatcher);
        assert_eq!(report.frames[0].sequence, Some(42));
    }

    /// Ready on every channel, but polling channel 3 fails.
    struct BrokenPoll {
        inner: SimRadio,
    }

    impl Transceiver for BrokenPoll {
        fn set_receive_callback(
            &mut self,
            callback: ReceiveCallback,
        ) -> sensorlink_radio::Result<()> {
            self.inner.set_receive_callback(callback)
        }

        fn readable_channel(&mut self) -> sensorlink_radio::Result<Option<ChannelId>> {
            self.inner.readable_channel()
        }

        fn is_readable(&mut self, channel: ChannelId) -> sensorlink_radio::Result<bool> {
            if channel == ch(3) {
                return Err(RadioError::Io(std::io::Error::other("spi bus fault")));
            }
            self.inner.is_readable(channel)
        }

        fn receive(&mut self, channel: ChannelId, buf: &mut [u8]) -> sensorlink_radio::Result<usize> {
            self.inner.receive(channel, buf)
        }
    }

    #[test]
    fn transport_error_aborts_scan_but_keeps_read_frames() {
        let radio = SimRadio::new();
        for channel in ChannelId::all() {
            radio.push_frame(channel, temperature_frame(i64::from(channel.get())));
        }
        let device = RadioDevice::new(
            "sim",
            BrokenPoll {
                inner: radio.clone(),
            },
        );
        let (dispatcher, _) = dispatcher(&[]);
        let mut scheduler = DrainScheduler::default();

        let report = scheduler.run_cycle(&device, &all_nodes(), &dispatcher);

        assert!(matches!(report.transport_error, Some(RadioError::Io(_))));
        assert_eq!(report.frames_read(), 2);
        assert_eq!(report.fields_dispatched(), 2);
        assert_eq!(radio.pending_total(), 3);
        assert_eq!(scheduler.state(), DrainState::Idle);
    }

    #[test]
    fn radio_is_released_before_listeners_run() {
        let radio = SimRadio::new();
        radio.push_frame(ch(1), temperature_frame(7));
        let device = Arc::new(RadioDevice::new("sim", radio));
        let (dispatcher, manager) = dispatcher(&[]);

        let free_during_read = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&free_during_read);
        let observer = Arc::clone(&device);
        manager
            .register_listener(
                &addr(ADDRESSES[0]),
                Listener::new(SensorTypeMask::ALL, move |_| {
                    let free = matches!(observer.try_open(), Ok(Some(_)));
                    sink.lock().unwrap().push(free);
                }),
            )
            .unwrap();

        DrainScheduler::default().run_cycle(&device, &all_nodes(), &dispatcher);

        assert_eq!(*free_during_read.lock().unwrap(), vec![true]);
    }
}
