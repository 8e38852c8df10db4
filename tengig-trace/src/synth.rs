//! Trace synthesis.
//!
//! The synthesizer turns a target mean data rate, a wire-length policy and a
//! duration into a fully encoded [`Trace`]. Inter-packet spacings are
//! expressed in integer transmit clock cycles; the fractional remainder of
//! every spacing is carried forward by an error-feedback quantizer so the
//! replayed stream converges on the target rate without ever being asked to
//! transmit faster than line rate.

use std::time::Duration;

use bytes::BytesMut;
use pnet::util::MacAddr;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio_util::codec::Encoder;
use tracing::debug;

use tengig_common::constants::{CLOCK_FREQ_SFP, FRAME_OVERHEAD, GAP_CYCLES_MAX, LINE_RATE};
use tengig_common::{secs_to_cycles, wire_time};

use crate::calibration::BurstInserter;
use crate::payload::{PayloadTemplate, CALIBRATION_MIN_SNAP};
use crate::record::{self, PacketRecord};
use crate::trace::Trace;
use crate::wire;

#[derive(Debug, Error)]
pub enum Error {
    #[error("trace would contain no packets ({rate} bps over {duration:?})")]
    EmptyTrace { rate: f64, duration: Duration },
    #[error("invalid wire length range [{min}, {max}]")]
    InvalidSizeRange { min: u16, max: u16 },
    #[error("snap length {0} is too short to mark calibration packets")]
    SnapTooShort(u16),
    #[error("invalid record: {0}")]
    Record(#[from] record::Error),
    #[error("encoding failed: {0}")]
    Wire(#[from] wire::Error),
}

/// Wire-length policy for synthesized packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    /// Every packet has the same wire length and packets are spaced at
    /// exactly the target rate (constant bit rate).
    Fixed(u16),
    /// Wire lengths drawn uniformly from `[min, max]`; the idle time between
    /// packets is exponentially distributed around the mean implied by the
    /// target rate.
    Uniform { min: u16, max: u16 },
}

impl SizePolicy {
    /// Mean wire length used for packet count and gap budgeting.
    fn mean_len(&self) -> u32 {
        match *self {
            Self::Fixed(len) => u32::from(len),
            Self::Uniform { min, max } => (u32::from(min) + u32::from(max)) / 2,
        }
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> u16 {
        match *self {
            Self::Fixed(len) => len,
            Self::Uniform { min, max } => rng.gen_range(min..=max),
        }
    }
}

/// Synthesis parameters that stay fixed across sweep iterations.
#[derive(Debug, Clone)]
pub struct SynthOptions {
    /// Transmit clock frequency gaps are quantized to, in Hz.
    clock: f64,
    /// Line rate of the interface, in bits per second.
    line_rate: f64,
    /// Payload bytes transferred to the hardware per packet; the MAC
    /// zero-pads frames up to their wire length.
    snap_len: u16,
    /// Minimum spacing between calibration bursts. `None` disables burst
    /// insertion.
    calibration_interval: Option<Duration>,
    /// Fixed RNG seed for reproducible traces.
    seed: Option<u64>,
    src_mac: MacAddr,
    dst_mac: MacAddr,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            clock: CLOCK_FREQ_SFP,
            line_rate: LINE_RATE,
            snap_len: 34,
            calibration_interval: None,
            seed: None,
            src_mac: MacAddr::new(0x53, 0, 0, 0, 0, 1),
            dst_mac: MacAddr::new(0x53, 0, 0, 0, 0, 2),
        }
    }
}

impl SynthOptions {
    /// Sets the transmit clock frequency in Hz.
    pub fn clock(mut self, clock: f64) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the interface line rate in bits per second.
    pub fn line_rate(mut self, line_rate: f64) -> Self {
        self.line_rate = line_rate;
        self
    }

    /// Sets the number of payload bytes transferred to the hardware per
    /// packet.
    pub fn snap_len(mut self, snap_len: u16) -> Self {
        self.snap_len = snap_len;
        self
    }

    /// Enables calibration bursts at the given minimum spacing.
    pub fn calibration_interval(mut self, interval: Duration) -> Self {
        self.calibration_interval = Some(interval);
        self
    }

    /// Seeds the RNG for reproducible traces.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the Ethernet addresses written into every payload.
    pub fn macs(mut self, src: MacAddr, dst: MacAddr) -> Self {
        self.src_mac = src;
        self.dst_mac = dst;
        self
    }
}

/// Error-feedback quantizer for inter-packet cycle counts.
///
/// The exact spacing for a target rate is a real number of cycles but the
/// hardware counts integers. Always rounding down replays faster than
/// requested and can exceed line rate; always rounding up replays too slow.
/// The quantizer rounds up while the accumulated rounding error is below one
/// full cycle and rounds down once it reaches one, so the time-averaged rate
/// converges on the target without ever producing a spacing the hardware
/// cannot sustain.
#[derive(Debug, Default)]
struct ErrorFeedback {
    /// Accumulated rounding error in cycles. Stays within `[0, 2)`.
    acc: f64,
}

impl ErrorFeedback {
    fn quantize(&mut self, cycles: f64) -> u64 {
        if self.acc < 1.0 {
            let up = cycles.ceil();
            self.acc += up - cycles;
            up as u64
        } else {
            let down = cycles.floor();
            self.acc -= cycles - down;
            down as u64
        }
    }

    #[cfg(test)]
    fn error(&self) -> f64 {
        self.acc
    }
}

/// Builds [`Trace`]s for the generator hardware.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    opts: SynthOptions,
}

impl Synthesizer {
    pub fn new(opts: SynthOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &SynthOptions {
        &self.opts
    }

    /// Number of packets a trace at `rate` bits per second over `duration`
    /// will contain under the given wire-length policy.
    pub fn packet_count(rate: f64, sizes: SizePolicy, duration: Duration) -> usize {
        let slot_bits = f64::from(8 * (sizes.mean_len() + FRAME_OVERHEAD));
        (duration.as_secs_f64() * rate / slot_bits).round() as usize
    }

    /// Synthesizes a trace that replays at a mean rate of `rate` bits per
    /// second for (approximately) `duration`.
    ///
    /// The returned trace reports its *realized* duration, i.e. the sum of
    /// the quantized cycle counts at the clock frequency; it differs from
    /// the request by less than one packet's transmit time.
    pub fn synthesize(
        &self,
        rate: f64,
        sizes: SizePolicy,
        duration: Duration,
    ) -> Result<Trace, Error> {
        if let SizePolicy::Uniform { min, max } = sizes {
            if min > max {
                return Err(Error::InvalidSizeRange { min, max });
            }
        }

        let n = Self::packet_count(rate, sizes, duration);
        if n == 0 {
            return Err(Error::EmptyTrace { rate, duration });
        }

        if self.opts.calibration_interval.is_some() && self.opts.snap_len < CALIBRATION_MIN_SNAP {
            return Err(Error::SnapTooShort(self.opts.snap_len));
        }

        let clock = self.opts.clock;
        let template =
            PayloadTemplate::ethernet(self.opts.src_mac, self.opts.dst_mac, self.opts.snap_len);

        let mut rng = match self.opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Mean idle time between two packets: the slot time at the target
        // rate minus the slot time at line rate.
        let mean_len = sizes.mean_len();
        let mean_gap = wire_time(mean_len, rate) - wire_time(mean_len, self.opts.line_rate);

        // The hardware gap counter is 32 bits wide.
        let max_spacing = f64::from(GAP_CYCLES_MAX) / clock;

        let mut inserter = self
            .opts
            .calibration_interval
            .map(|interval| BurstInserter::new(secs_to_cycles(interval.as_secs_f64(), clock) as u64));

        let mut rounder = ErrorFeedback::default();
        let mut codec = wire::Codec::new();
        let mut buf =
            BytesMut::with_capacity(n * (wire::META_LEN + usize::from(self.opts.snap_len)) + 64);

        let mut total_cycles: u64 = 0;
        let mut wire_bytes: u64 = 0;
        let mut expected_intervals = Vec::new();

        debug!(packets = n, rate, "synthesizing trace");

        let mut emitted = 0usize;
        loop {
            let wire_len = sizes.draw(&mut rng);

            // Inter-packet spacing: transmit time plus idle time. For the
            // fixed policy the spacing is exactly the slot time at the
            // target rate; for the random policy the idle time is drawn from
            // an exponential distribution.
            let spacing = match sizes {
                SizePolicy::Fixed(len) => wire_time(u32::from(len), rate),
                SizePolicy::Uniform { .. } => {
                    wire_time(u32::from(wire_len), self.opts.line_rate)
                        + mean_gap * exp_sample(&mut rng)
                }
            };
            let spacing = spacing.min(max_spacing);

            let cycles = rounder.quantize(secs_to_cycles(spacing, clock));
            let gap_cycles = cycles.min(u64::from(GAP_CYCLES_MAX)) as u32;
            total_cycles += u64::from(gap_cycles);
            wire_bytes += u64::from(wire_len);

            let slot = inserter.as_mut().and_then(|ins| ins.advance(gap_cycles));
            if let Some(slot) = slot {
                // The last packet of a burst has no successor within the
                // burst, so its spacing is not validated.
                if !slot.is_last() {
                    expected_intervals.push(spacing);
                }
            }

            let payload =
                if slot.is_some() { template.calibration() } else { template.ordinary() };
            let record = PacketRecord::new(gap_cycles, wire_len, payload, slot.is_some())?;
            codec.encode(record, &mut buf)?;

            emitted += 1;
            // A burst in flight runs to completion even at the end of the
            // trace, so flagged packets always come in groups of four.
            let burst_open = inserter.as_ref().is_some_and(|ins| ins.in_progress());
            if emitted >= n && !burst_open {
                break;
            }
        }

        wire::pad_to_alignment(&mut buf);

        let calibration_count = inserter.map_or(0, |ins| ins.inserted());
        debug!(
            packets = n,
            size = buf.len(),
            calibration = calibration_count,
            "synthesized trace"
        );

        Ok(Trace::new(
            buf.freeze(),
            emitted,
            total_cycles,
            clock,
            wire_bytes,
            calibration_count,
            expected_intervals,
        ))
    }
}

/// Inverse transform sample of Exp(1).
fn exp_sample<R: Rng>(rng: &mut R) -> f64 {
    -(1.0 - rng.gen::<f64>()).ln()
}
