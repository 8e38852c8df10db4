//! Deterministic software model of the tester.
//!
//! The model reproduces the feedback surface of the real device: replay
//! demand below the configured sustainable limit completes with matching
//! transmit and capture counters, demand above it asserts an overrun
//! register and stalls the counters mid-trace. It backs the sweep tests and
//! lets the search logic be exercised without hardware attached.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::capture::{Capture, CapturePacket};
use crate::{NetworkTester, Overrun, TesterConfig};

/// Error register asserted when replay demand exceeds the sustainable rate.
const REG_REPLAY_GAP: &str = "replay_mem_gap";

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no configuration has been written")]
    NotConfigured,
    #[error("interface {0} out of range")]
    BadInterface(usize),
}

/// Deterministic in-process stand-in for the tester fabric.
#[derive(Debug)]
pub struct SimTester {
    interfaces: usize,
    /// Highest per-interface data rate the model sustains, bits per second.
    limit: f64,
    /// Modeled replay-to-capture latency, seconds.
    latency: f64,
    config: Option<TesterConfig>,
    capturing: bool,
    error: Option<Overrun>,
    tx_counts: Vec<u64>,
    rx_counts: Vec<u64>,
    captures: Vec<Option<Capture>>,
    /// Packets to drop from the captured counter of interface 0 on the next
    /// successful run. Models a capture accounting fault.
    inject_loss: u64,
    /// Number of completed replay runs.
    runs: u64,
}

impl SimTester {
    pub fn new(interfaces: usize, limit: f64) -> Self {
        Self {
            interfaces,
            limit,
            latency: 1.2e-6,
            config: None,
            capturing: false,
            error: None,
            tx_counts: vec![0; interfaces],
            rx_counts: vec![0; interfaces],
            captures: vec![None; interfaces],
            inject_loss: 0,
            runs: 0,
        }
    }

    /// Sets the modeled replay-to-capture latency in seconds.
    pub fn latency(mut self, latency: f64) -> Self {
        self.latency = latency;
        self
    }

    /// Drops `count` packets from the captured counter of the next
    /// successful run without asserting an error register.
    pub fn inject_capture_loss(&mut self, count: u64) {
        self.inject_loss = count;
    }

    /// Number of completed replay runs.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    fn model_capture(&self, trace: &tengig_trace::Trace) -> Capture {
        // Arrival of packet k is the accumulated spacing of its
        // predecessors, replayed at the synthesis clock.
        let clock_period = trace.duration().as_secs_f64() / trace.total_cycles() as f64;
        let mut arrival = 0.0;
        let mut packets = Vec::with_capacity(trace.packet_count());

        match trace.records() {
            Ok(records) => {
                for record in records {
                    packets.push(CapturePacket {
                        arrival,
                        latency: self.latency,
                        wire_len: record.wire_len(),
                    });
                    arrival += f64::from(record.gap_cycles()) * clock_period;
                }
            }
            Err(_) => return Capture::default(),
        }

        Capture::new(packets)
    }
}

#[async_trait]
impl NetworkTester for SimTester {
    type Error = SimError;

    fn interfaces(&self) -> usize {
        self.interfaces
    }

    async fn write_config(&mut self, config: TesterConfig) -> Result<(), SimError> {
        if config.interfaces() > self.interfaces {
            return Err(SimError::BadInterface(config.interfaces()));
        }

        self.error = None;
        self.tx_counts.iter_mut().for_each(|c| *c = 0);
        self.rx_counts.iter_mut().for_each(|c| *c = 0);
        self.config = Some(config);
        Ok(())
    }

    async fn start_capture(&mut self) -> Result<(), SimError> {
        if self.config.is_none() {
            return Err(SimError::NotConfigured);
        }
        self.capturing = true;
        Ok(())
    }

    async fn start_replay(&mut self) -> Result<(), SimError> {
        let config = self.config.clone().ok_or(SimError::NotConfigured)?;
        let capture_enabled = self.capturing && config.capture_options().is_enabled();
        let keep_data = capture_enabled && !config.capture_options().is_discard();

        for (iface, trace) in config.traces().iter().enumerate() {
            let Some(trace) = trace else { continue };
            let demand = trace.mean_rate();

            if demand > self.limit {
                // The generator runs dry mid-trace and latches the error
                // register; counters freeze where the replay stalled.
                debug!(iface, demand, limit = self.limit, "replay overrun");
                self.error = Some(Overrun::new(REG_REPLAY_GAP));

                let replayed = (trace.packet_count() as f64 * self.limit / demand) as u64;
                self.tx_counts[iface] = replayed;
                if capture_enabled {
                    self.rx_counts[iface] = replayed.saturating_sub(1);
                }
                continue;
            }

            self.tx_counts[iface] = trace.packet_count() as u64;
            if capture_enabled {
                let mut captured = trace.packet_count() as u64;
                if iface == 0 {
                    captured = captured.saturating_sub(self.inject_loss);
                }
                self.rx_counts[iface] = captured;

                if keep_data {
                    self.captures[iface] = Some(self.model_capture(trace));
                }
            }
        }

        self.inject_loss = 0;
        self.runs += 1;
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<(), SimError> {
        self.capturing = false;
        Ok(())
    }

    fn check_error(&self) -> Option<Overrun> {
        self.error.clone()
    }

    fn packet_count_tx(&self, interface: usize) -> u64 {
        self.tx_counts.get(interface).copied().unwrap_or(0)
    }

    fn packet_count_captured(&self, interface: usize) -> u64 {
        self.rx_counts.get(interface).copied().unwrap_or(0)
    }

    fn take_capture(&mut self, interface: usize) -> Option<Capture> {
        self.captures.get_mut(interface).and_then(Option::take)
    }

    fn free_host_memory(&mut self) {
        self.config = None;
        self.captures.iter_mut().for_each(|c| *c = None);
        debug!("released host buffers");
    }
}
