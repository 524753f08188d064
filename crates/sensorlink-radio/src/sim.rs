use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tracing::debug;

use crate::channel::{ChannelId, MAX_CHANNELS};
use crate::error::{RadioError, Result};
use crate::traits::{ReceiveCallback, Transceiver};

/// In-memory transceiver.
///
/// Clones share state, so a test or tool can keep one handle to inject frames
/// while the router owns another inside a [`RadioDevice`](crate::RadioDevice).
#[derive(Clone, Default)]
pub struct SimRadio {
    state: Arc<Mutex<SimState>>,
}

#[derive(Default)]
struct SimState {
    queues: [VecDeque<Bytes>; MAX_CHANNELS as usize],
    stuck: [Option<Bytes>; MAX_CHANNELS as usize],
    failures: [usize; MAX_CHANNELS as usize],
    callback: Option<ReceiveCallback>,
    reads: usize,
    polls: usize,
}

impl SimRadio {
    /// Create an idle transceiver with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one frame on `channel`.
    pub fn push_frame(&self, channel: ChannelId, frame: impl Into<Bytes>) {
        self.state().queues[channel.index()].push_back(frame.into());
    }

    /// Make `channel` report the same frame forever, like a pipe whose FIFO
    /// never empties.
    pub fn set_stuck(&self, channel: ChannelId, frame: impl Into<Bytes>) {
        self.state().stuck[channel.index()] = Some(frame.into());
    }

    /// Make the next `count` receives on `channel` fail with an I/O error.
    pub fn fail_receives(&self, channel: ChannelId, count: usize) {
        self.state().failures[channel.index()] = count;
    }

    /// Frames still queued on `channel`.
    pub fn pending(&self, channel: ChannelId) -> usize {
        self.state().queues[channel.index()].len()
    }

    /// Frames still queued across all channels.
    pub fn pending_total(&self) -> usize {
        self.state().queues.iter().map(VecDeque::len).sum()
    }

    /// Receives performed so far, including failed ones.
    pub fn receive_count(&self) -> usize {
        self.state().reads
    }

    /// Readability polls performed so far.
    pub fn poll_count(&self) -> usize {
        self.state().polls
    }

    /// Whether a receive callback has been installed.
    pub fn has_callback(&self) -> bool {
        self.state().callback.is_some()
    }

    /// Fire the receive interrupt. Returns false when no callback is installed.
    pub fn raise_interrupt(&self) -> bool {
        // Invoke outside the state lock; the callback may post work that reads us.
        let callback = self.state().callback.clone();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // Shared test plumbing only; a panicked holder leaves the queues usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SimState {
    fn has_data(&self, channel: ChannelId) -> bool {
        self.stuck[channel.index()].is_some() || !self.queues[channel.index()].is_empty()
    }
}

impl Transceiver for SimRadio {
    fn set_receive_callback(&mut self, callback: ReceiveCallback) -> Result<()> {
        self.state().callback = Some(callback);
        Ok(())
    }

    fn readable_channel(&mut self) -> Result<Option<ChannelId>> {
        let mut state = self.state();
        state.polls += 1;
        Ok(ChannelId::all().find(|channel| state.has_data(*channel)))
    }

    fn is_readable(&mut self, channel: ChannelId) -> Result<bool> {
        let mut state = self.state();
        state.polls += 1;
        Ok(state.has_data(channel))
    }

    fn receive(&mut self, channel: ChannelId, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state();
        state.reads += 1;

        let idx = channel.index();
        if state.failures[idx] > 0 {
            state.failures[idx] -= 1;
            return Err(RadioError::Receive {
                channel,
                source: std::io::Error::other("injected receive failure"),
            });
        }

        let frame = match &state.stuck[idx] {
            Some(frame) => frame.clone(),
            None => match state.queues[idx].pop_front() {
                Some(frame) => frame,
                None => return Ok(0),
            },
        };

        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        debug!(%channel, len = n, "sim radio delivered frame");
        Ok(n)
    }
}

impl std::fmt::Debug for SimRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimRadio")
            .field("pending", &self.pending_total())
            .finish()
    }
}
