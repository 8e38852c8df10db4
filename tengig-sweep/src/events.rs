//! Contextual progress events.
//!
//! Sweeps report what they are doing through an [`Observer`] supplied by the
//! caller instead of mutating any process-wide logging state. The default
//! [`TracingObserver`] forwards everything to `tracing`.

use tracing::{info, warn};

use crate::bisect::ProbeOutcome;

/// One progress or inconsistency report from a sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    /// A trace for the next probe has been synthesized.
    TraceSynthesized { packet_len: u16, rate: f64, packets: usize, size: usize },
    /// A measurement run is about to start.
    ProbeStarted { packet_len: u16, rate: f64 },
    /// The hardware feedback of a run has been classified.
    ProbeClassified { packet_len: u16, rate: f64, outcome: ProbeOutcome },
    /// Transmit/capture accounting disagreed without a hardware error.
    /// Loud and operator-visible, but the sweep point keeps probing.
    Inconsistency { packet_len: u16, tx: u64, captured: u64, expected: u64 },
    /// A sweep point finished; the reported figures are scaled to the whole
    /// device.
    SweepPointConverged { packet_len: u16, max_datarate: f64, required_membw: f64 },
}

/// Receives sweep events. Implementations run inline with the measurement
/// loop and must be cheap.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &ProbeEvent);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &ProbeEvent) {
        match event {
            ProbeEvent::Inconsistency { packet_len, tx, captured, expected } => warn!(
                packet_len = *packet_len,
                tx = *tx,
                captured = *captured,
                expected = *expected,
                "transmit/capture packet accounting mismatch"
            ),
            event => info!(?event, "sweep progress"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: &ProbeEvent) {}
}
