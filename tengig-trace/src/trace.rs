use std::time::Duration;

use bytes::Bytes;

use tengig_common::constants::FRAME_OVERHEAD;

use crate::record::PacketRecord;
use crate::wire;

/// An immutable, replay-ordered packet trace.
///
/// A trace is produced once by the [`Synthesizer`](crate::Synthesizer),
/// handed to the hardware adapter for a single replay and dropped
/// afterwards. All timing is final at construction: the reported duration is
/// derived purely from the quantized per-packet cycle counts at the
/// synthesis clock frequency, never from the nominal request.
#[derive(Debug, Clone)]
pub struct Trace {
    /// Encoded trace records, 64 byte aligned (see [`wire`]).
    buf: Bytes,
    packet_count: usize,
    /// Sum of all quantized inter-packet spacings.
    total_cycles: u64,
    /// Clock frequency the cycle counts refer to, in Hz.
    clock: f64,
    /// Sum of all wire lengths, framing overhead not included.
    wire_bytes: u64,
    calibration_count: u64,
    /// Nominal inter-packet times recorded for the first three packets of
    /// every calibration burst, in seconds.
    expected_intervals: Vec<f64>,
}

impl Trace {
    pub(crate) fn new(
        buf: Bytes,
        packet_count: usize,
        total_cycles: u64,
        clock: f64,
        wire_bytes: u64,
        calibration_count: u64,
        expected_intervals: Vec<f64>,
    ) -> Self {
        Self {
            buf,
            packet_count,
            total_cycles,
            clock,
            wire_bytes,
            calibration_count,
            expected_intervals,
        }
    }

    /// The encoded trace buffer as transferred to device memory.
    pub fn buffer(&self) -> &Bytes {
        &self.buf
    }

    pub fn into_buffer(self) -> Bytes {
        self.buf
    }

    /// Size of the encoded buffer in bytes, padding included.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn packet_count(&self) -> usize {
        self.packet_count
    }

    /// Sum of all quantized inter-packet spacings, in transmit clock cycles.
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// The realized replay duration: the quantized cycle counts replayed at
    /// the synthesis clock frequency.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_cycles as f64 / self.clock)
    }

    /// The mean data rate the replayed trace achieves on the wire, framing
    /// overhead included, in bits per second.
    pub fn mean_rate(&self) -> f64 {
        let bits =
            8.0 * (self.wire_bytes + self.packet_count as u64 * u64::from(FRAME_OVERHEAD)) as f64;
        bits / self.duration().as_secs_f64()
    }

    /// Number of calibration packets in the trace, always a multiple of 4.
    pub fn calibration_count(&self) -> u64 {
        self.calibration_count
    }

    /// Nominal inter-packet times recorded for the first three packets of
    /// every calibration burst, used to validate hardware-measured burst
    /// timing against the synthesized ground truth. Seconds.
    pub fn expected_calibration_intervals(&self) -> &[f64] {
        &self.expected_intervals
    }

    /// Decodes the trace buffer back into its packet records.
    pub fn records(&self) -> Result<Vec<PacketRecord>, wire::Error> {
        wire::decode_trace(&self.buf)
    }
}
