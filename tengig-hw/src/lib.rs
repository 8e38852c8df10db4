//! The hardware collaborator seam.
//!
//! The physical tester is driven through the [`NetworkTester`] trait:
//! configuration is written down to the device, replay and capture are
//! started and stopped per measurement run, and per-interface packet
//! counters plus the error registers are read back afterwards. An asserted
//! error register is a *domain signal* (the device could not keep pace), so
//! it is surfaced as an [`Overrun`] value rather than an `Err`.
//!
//! A deterministic software model lives in [`sim`] and the PCIe DMA
//! throughput benchmark in [`dma`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use tengig_trace::Trace;

pub mod capture;
pub mod dma;
pub mod sim;

pub use capture::{Capture, CapturePacket};

/// A hardware-asserted overrun condition.
///
/// The generator or capture path could not sustain the configured rate and
/// stopped; the name of the asserted error register is carried along for the
/// operator. This drives the throughput search and is never raised as an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overrun {
    register: String,
}

impl Overrun {
    pub fn new(register: impl Into<String>) -> Self {
        Self { register: register.into() }
    }

    /// Name of the error register the hardware asserted.
    pub fn register(&self) -> &str {
        &self.register
    }
}

impl fmt::Display for Overrun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hardware asserted error register '{}'", self.register)
    }
}

/// How the hardware embeds transmit timestamps into outgoing packets for
/// latency measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampMode {
    /// No timestamps are inserted.
    #[default]
    Disabled,
    /// Timestamps are inserted at a fixed byte position in every packet.
    FixedPos,
}

/// Capture-path configuration applied to every receiver.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    enable: bool,
    /// Bytes retained per captured packet; 0 keeps metadata only.
    max_len: u16,
    /// Discard capture data once transferred from the device, keeping only
    /// the counters. Reduces the host memory footprint on long sweeps.
    discard: bool,
    /// Host memory reserved for capture data, in bytes.
    host_mem_size: Option<u64>,
    timestamp_mode: TimestampMode,
    /// Byte position of the embedded timestamp.
    timestamp_pos: u16,
    /// Width of the embedded timestamp in bits.
    timestamp_width: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            enable: false,
            max_len: 1518,
            discard: false,
            host_mem_size: None,
            timestamp_mode: TimestampMode::Disabled,
            timestamp_pos: 0,
            timestamp_width: 24,
        }
    }
}

impl CaptureOptions {
    /// Enables packet capture on all receivers.
    pub fn enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// Sets the number of bytes retained per captured packet.
    pub fn max_len(mut self, max_len: u16) -> Self {
        self.max_len = max_len;
        self
    }

    /// Discards capture data after transfer, keeping only the counters.
    pub fn discard(mut self, discard: bool) -> Self {
        self.discard = discard;
        self
    }

    /// Reserves host capture memory, in bytes.
    pub fn host_mem_size(mut self, size: u64) -> Self {
        self.host_mem_size = Some(size);
        self
    }

    /// Configures timestamp insertion.
    pub fn timestamps(mut self, mode: TimestampMode, pos: u16, width: u8) -> Self {
        self.timestamp_mode = mode;
        self.timestamp_pos = pos;
        self.timestamp_width = width;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enable
    }

    pub fn is_discard(&self) -> bool {
        self.discard
    }

    pub fn capture_max_len(&self) -> u16 {
        self.max_len
    }

    pub fn capture_host_mem_size(&self) -> Option<u64> {
        self.host_mem_size
    }

    pub fn timestamp_mode(&self) -> TimestampMode {
        self.timestamp_mode
    }

    pub fn timestamp_pos(&self) -> u16 {
        self.timestamp_pos
    }

    pub fn timestamp_width(&self) -> u8 {
        self.timestamp_width
    }
}

/// The complete hardware state written down for one replay/capture session:
/// per-interface traces plus the capture settings.
///
/// Traces are shared by reference counting so the same trace can be assigned
/// to several generators without duplicating the buffer.
#[derive(Debug, Clone)]
pub struct TesterConfig {
    traces: Vec<Option<Arc<Trace>>>,
    capture: CaptureOptions,
}

impl TesterConfig {
    pub fn new(interfaces: usize) -> Self {
        Self { traces: vec![None; interfaces], capture: CaptureOptions::default() }
    }

    /// Assigns a trace to the generator on `interface`.
    pub fn trace(mut self, interface: usize, trace: Arc<Trace>) -> Self {
        self.traces[interface] = Some(trace);
        self
    }

    /// Sets the capture options applied to every receiver.
    pub fn capture(mut self, capture: CaptureOptions) -> Self {
        self.capture = capture;
        self
    }

    pub fn interfaces(&self) -> usize {
        self.traces.len()
    }

    pub fn traces(&self) -> &[Option<Arc<Trace>>] {
        &self.traces
    }

    pub fn capture_options(&self) -> &CaptureOptions {
        &self.capture
    }

    /// Total number of packets the configured replay will transmit across
    /// all interfaces.
    pub fn expected_packets(&self) -> u64 {
        self.traces
            .iter()
            .flatten()
            .map(|trace| trace.packet_count() as u64)
            .sum()
    }
}

/// Contract of the tester hardware.
///
/// One replay/capture session at a time: `start_replay` resolves only once
/// the replay has completed, and no two sessions ever overlap.
#[async_trait]
pub trait NetworkTester {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of 10GbE interfaces on the device.
    fn interfaces(&self) -> usize;

    /// Writes traces and capture settings down to the device.
    async fn write_config(&mut self, config: TesterConfig) -> Result<(), Self::Error>;

    /// Arms packet capture on all enabled receivers.
    async fn start_capture(&mut self) -> Result<(), Self::Error>;

    /// Starts trace replay on all configured generators; resolves once the
    /// replay has completed.
    async fn start_replay(&mut self) -> Result<(), Self::Error>;

    /// Stops packet capture and drains outstanding transfers.
    async fn stop_capture(&mut self) -> Result<(), Self::Error>;

    /// Reads the hardware error registers. An asserted overrun is consumed
    /// by the throughput search, not raised as an `Err`.
    fn check_error(&self) -> Option<Overrun>;

    /// Number of packets transmitted on `interface` during the last replay.
    fn packet_count_tx(&self, interface: usize) -> u64;

    /// Number of packets captured on `interface` during the last session.
    fn packet_count_captured(&self, interface: usize) -> u64;

    /// Takes ownership of the capture data collected on `interface`.
    fn take_capture(&mut self, interface: usize) -> Option<Capture>;

    /// Releases host-side trace and capture buffers of the last session.
    /// Called between measurement iterations to bound memory usage.
    fn free_host_memory(&mut self);
}
