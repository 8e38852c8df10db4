//! Maximum replay+capture throughput discovery.
//!
//! For every packet length of interest the sweep bisects over the
//! per-interface data rate: a trace is synthesized at the candidate rate,
//! replayed on all interfaces with capture armed, and the hardware feedback
//! (error registers plus transmit/capture counters) steers the search. One
//! result row per packet length is produced on convergence.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use tengig_common::constants::LINE_RATE;
use tengig_hw::{CaptureOptions, NetworkTester, TesterConfig};
use tengig_trace::{synth, SizePolicy, SynthOptions, Synthesizer};

use crate::bisect::{Bisection, ProbeOutcome};
use crate::events::{Observer, ProbeEvent};

#[derive(Debug, Error)]
pub enum SweepError<E: std::error::Error> {
    #[error("trace synthesis failed: {0}")]
    Synth(#[from] synth::Error),
    #[error("hardware adapter error: {0}")]
    Adapter(E),
}

/// Fixed multipliers scaling per-interface figures to the whole device.
#[derive(Debug, Clone, Copy)]
pub struct Topology {
    /// Interfaces generating and capturing concurrently.
    pub interfaces: usize,
}

impl Topology {
    /// Replay and capture stream against the same DRAM at the same time.
    const CONCURRENT_REPLAY_CAPTURE: f64 = 2.0;
    /// Every buffer is both written to and read back from DRAM.
    const DRAM_READ_WRITE: f64 = 2.0;

    pub fn datarate_multiplier(&self) -> f64 {
        self.interfaces as f64
    }

    pub fn membw_multiplier(&self) -> f64 {
        self.interfaces as f64 * Self::CONCURRENT_REPLAY_CAPTURE * Self::DRAM_READ_WRITE
    }
}

/// Throughput sweep parameters.
#[derive(Debug, Clone)]
pub struct ThroughputSweepOptions {
    /// Packet lengths probed, one sweep point each.
    packet_lengths: Vec<u16>,
    /// Nominal replay duration per probe.
    duration: Duration,
    /// Known-safe per-interface rate the bisection starts from.
    rate_min: f64,
    /// Initial bisection step.
    step_init: f64,
    /// Step resolution floor; convergence condition.
    step_limit: f64,
    /// Saturation ceiling, the link's nominal rate.
    saturation: f64,
    /// Bytes retained per captured packet.
    capture_max_len: u16,
}

impl Default for ThroughputSweepOptions {
    fn default() -> Self {
        Self {
            packet_lengths: vec![
                64, 104, 152, 200, 256, 304, 352, 400, 456, 504, 552, 600, 656, 704, 752, 800,
                856, 904, 952, 1000, 1056, 1104, 1152, 1200, 1256, 1304, 1352, 1400, 1456, 1518,
            ],
            duration: Duration::from_secs(10),
            rate_min: 8e9,
            step_init: 2e9,
            step_limit: 0.01e9,
            saturation: LINE_RATE,
            capture_max_len: 1518,
        }
    }
}

impl ThroughputSweepOptions {
    /// Sets the packet lengths to probe.
    pub fn packet_lengths(mut self, lengths: impl Into<Vec<u16>>) -> Self {
        self.packet_lengths = lengths.into();
        self
    }

    /// Sets the nominal replay duration per probe.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the bisection parameters: start rate, initial step and step
    /// resolution floor.
    pub fn bisection(mut self, rate_min: f64, step_init: f64, step_limit: f64) -> Self {
        self.rate_min = rate_min;
        self.step_init = step_init;
        self.step_limit = step_limit;
        self
    }

    /// Sets the saturation ceiling.
    pub fn saturation(mut self, saturation: f64) -> Self {
        self.saturation = saturation;
        self
    }

    /// Sets the number of bytes retained per captured packet.
    pub fn capture_max_len(mut self, max_len: u16) -> Self {
        self.capture_max_len = max_len;
        self
    }
}

/// One converged sweep point, scaled to the whole device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRow {
    pub packet_len: u16,
    /// Maximum sustained data rate summed over all interfaces, bits per
    /// second.
    pub max_datarate: f64,
    /// Memory bandwidth the device needs at that rate, bits per second.
    pub required_membw: f64,
}

/// The throughput discovery sweep.
#[derive(Debug, Clone, Default)]
pub struct ThroughputSweep {
    opts: ThroughputSweepOptions,
}

impl ThroughputSweep {
    pub fn new(opts: ThroughputSweepOptions) -> Self {
        Self { opts }
    }

    /// Runs the sweep to completion, one bisection per packet length.
    ///
    /// Strictly sequential: every iteration blocks on replay completion
    /// before the feedback is read, and each trace buffer is released before
    /// the next one is allocated.
    pub async fn run<T: NetworkTester>(
        &self,
        tester: &mut T,
        observer: &dyn Observer,
    ) -> Result<Vec<SweepRow>, SweepError<T::Error>> {
        let interfaces = tester.interfaces();
        let topology = Topology { interfaces };
        let mut rows = Vec::with_capacity(self.opts.packet_lengths.len());

        for (point, &packet_len) in self.opts.packet_lengths.iter().enumerate() {
            info!(
                point = point + 1,
                points = self.opts.packet_lengths.len(),
                packet_len,
                "sweep point"
            );

            // The full frame minus FCS is transferred down; the MAC appends
            // the FCS on transmit.
            let synthesizer = Synthesizer::new(SynthOptions::default().snap_len(packet_len - 4));
            let mut bisection = Bisection::new(
                self.opts.rate_min,
                self.opts.step_init,
                self.opts.step_limit,
                self.opts.saturation,
            );

            while !bisection.is_converged() {
                let rate = bisection.rate();
                observer.on_event(&ProbeEvent::ProbeStarted { packet_len, rate });
                info!(rate, packet_len, "probing");

                let trace = synthesizer.synthesize(
                    rate,
                    SizePolicy::Fixed(packet_len),
                    self.opts.duration,
                )?;
                observer.on_event(&ProbeEvent::TraceSynthesized {
                    packet_len,
                    rate,
                    packets: trace.packet_count(),
                    size: trace.size(),
                });

                // Memory bandwidth needed to stream this trace, per
                // interface and direction.
                let cost = 8.0 * trace.size() as f64 / trace.duration().as_secs_f64();
                let expected = trace.packet_count() as u64 * interfaces as u64;

                let trace = Arc::new(trace);
                let mut config = TesterConfig::new(interfaces).capture(
                    CaptureOptions::default()
                        .enable(true)
                        .discard(true)
                        .max_len(self.opts.capture_max_len),
                );
                for iface in 0..interfaces {
                    config = config.trace(iface, Arc::clone(&trace));
                }
                // The adapter now owns the only references; dropping ours
                // lets `free_host_memory` release the buffer before the
                // next iteration allocates.
                drop(trace);

                tester.write_config(config).await.map_err(SweepError::Adapter)?;
                tester.start_capture().await.map_err(SweepError::Adapter)?;
                tester.start_replay().await.map_err(SweepError::Adapter)?;
                tester.stop_capture().await.map_err(SweepError::Adapter)?;

                let outcome = classify(tester, expected);
                observer.on_event(&ProbeEvent::ProbeClassified {
                    packet_len,
                    rate,
                    outcome: outcome.clone(),
                });

                match &outcome {
                    ProbeOutcome::Overrun(overrun) => {
                        info!(%overrun, rate, "throughput limit reached");
                    }
                    ProbeOutcome::Success => {}
                    ProbeOutcome::CountMismatch { tx, captured, expected } => {
                        warn!(
                            tx = *tx,
                            captured = *captured,
                            expected = *expected,
                            "transmit/capture packet accounting mismatch"
                        );
                        observer.on_event(&ProbeEvent::Inconsistency {
                            packet_len,
                            tx: *tx,
                            captured: *captured,
                            expected: *expected,
                        });
                    }
                }

                bisection.observe(&outcome, cost);
                tester.free_host_memory();
            }

            let (best_rate, best_cost) = bisection.best();
            let row = SweepRow {
                packet_len,
                max_datarate: best_rate * topology.datarate_multiplier(),
                required_membw: best_cost * topology.membw_multiplier(),
            };
            info!(
                packet_len,
                max_datarate = row.max_datarate,
                required_membw = row.required_membw,
                "sweep point converged"
            );
            observer.on_event(&ProbeEvent::SweepPointConverged {
                packet_len,
                max_datarate: row.max_datarate,
                required_membw: row.required_membw,
            });
            rows.push(row);
        }

        Ok(rows)
    }
}

/// Classifies the hardware feedback of one run.
fn classify<T: NetworkTester>(tester: &T, expected: u64) -> ProbeOutcome {
    if let Some(overrun) = tester.check_error() {
        return ProbeOutcome::Overrun(overrun);
    }

    let tx: u64 = (0..tester.interfaces()).map(|i| tester.packet_count_tx(i)).sum();
    let captured: u64 = (0..tester.interfaces()).map(|i| tester.packet_count_captured(i)).sum();

    if tx == captured && tx == expected {
        ProbeOutcome::Success
    } else {
        ProbeOutcome::CountMismatch { tx, captured, expected }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tengig_hw::sim::SimTester;

    use super::*;
    use crate::events::NullObserver;

    /// Collects every event for inspection.
    #[derive(Debug, Default)]
    struct Recorder {
        events: Mutex<Vec<ProbeEvent>>,
    }

    impl Observer for Recorder {
        fn on_event(&self, event: &ProbeEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn options() -> ThroughputSweepOptions {
        ThroughputSweepOptions::default()
            .packet_lengths(vec![64])
            .duration(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn sweep_converges_close_to_the_device_limit() {
        let _ = tracing_subscriber::fmt::try_init();

        let limit = 9.2e9;
        let mut tester = SimTester::new(4, limit);
        let rows =
            ThroughputSweep::new(options()).run(&mut tester, &NullObserver).await.unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.packet_len, 64);

        // Scaled by four generating+capturing interfaces.
        let per_interface = row.max_datarate / 4.0;
        assert!(per_interface <= limit);
        assert!(limit - per_interface <= 2.0 * 0.01e9, "per-interface {per_interface}");
        // 4 interfaces x concurrent replay/capture x DRAM read+write.
        assert!(row.required_membw > 0.0);
    }

    #[tokio::test]
    async fn saturated_device_reports_line_rate() {
        let mut tester = SimTester::new(4, 11e9);
        let rows =
            ThroughputSweep::new(options()).run(&mut tester, &NullObserver).await.unwrap();
        assert_eq!(rows[0].max_datarate, 4.0 * 10e9);
    }

    #[tokio::test]
    async fn count_mismatch_is_surfaced_not_swallowed() {
        let mut tester = SimTester::new(4, 9.2e9);
        tester.inject_capture_loss(3);

        let recorder = Recorder::default();
        let rows = ThroughputSweep::new(options()).run(&mut tester, &recorder).await.unwrap();

        let events = recorder.events.lock().unwrap();
        let mismatches: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ProbeEvent::Inconsistency { .. }))
            .collect();
        assert_eq!(mismatches.len(), 1);
        let ProbeEvent::Inconsistency { tx, captured, .. } = mismatches[0] else {
            unreachable!()
        };
        assert_eq!(tx - captured, 3);

        // The sweep still converged afterwards.
        assert_eq!(rows.len(), 1);
        assert!(rows[0].max_datarate > 0.0);
    }

    #[tokio::test]
    async fn every_probe_frees_host_memory() {
        let mut tester = SimTester::new(4, 9.2e9);
        let recorder = Recorder::default();
        ThroughputSweep::new(options()).run(&mut tester, &recorder).await.unwrap();

        let events = recorder.events.lock().unwrap();
        let probes = events
            .iter()
            .filter(|e| matches!(e, ProbeEvent::ProbeClassified { .. }))
            .count();
        assert_eq!(probes as u64, tester.runs());
        // take_capture is empty: discard mode kept no data.
        assert!(tester.take_capture(0).is_none());
    }
}
