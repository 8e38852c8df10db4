//! Shared constants and unit helpers for the `tengig` crates.

/// Constants describing the 10GbE datapath of the tester hardware.
pub mod constants {
    /// Transmit clock frequency of the SFP+ 64 bit datapath, in Hz.
    pub const CLOCK_FREQ_SFP: f64 = 156.25e6;

    /// Nominal line rate of one interface, in bits per second.
    pub const LINE_RATE: f64 = 10e9;

    /// Ethernet preamble, start-of-frame delimiter, FCS and minimum
    /// inter-frame gap, in bytes. Every frame occupies this many bytes on the
    /// wire in addition to its nominal length.
    pub const FRAME_OVERHEAD: u32 = 24;

    /// Largest inter-packet gap the hardware gap counter can express, in
    /// transmit clock cycles.
    pub const GAP_CYCLES_MAX: u32 = u32::MAX;

    /// Trace buffers are padded to this alignment before the DMA transfer to
    /// device memory.
    pub const TRACE_ALIGN: usize = 64;

    /// Sentinel word filling the trace buffer padding.
    pub const TRACE_PAD: u64 = u64::MAX;
}

/// Returns the time in seconds a frame of `wire_len` bytes occupies the wire
/// at `rate` bits per second, framing overhead included.
#[inline]
pub fn wire_time(wire_len: u32, rate: f64) -> f64 {
    f64::from(8 * (wire_len + constants::FRAME_OVERHEAD)) / rate
}

/// Converts a transmit clock cycle count to seconds at `clock` Hz.
#[inline]
pub fn cycles_to_secs(cycles: u64, clock: f64) -> f64 {
    cycles as f64 / clock
}

/// Converts a time in seconds to a real-valued cycle count at `clock` Hz.
#[inline]
pub fn secs_to_cycles(secs: f64, clock: f64) -> f64 {
    secs * clock
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_time_includes_overhead() {
        // A 64 byte frame occupies 88 byte slots on a 10G link.
        let t = wire_time(64, constants::LINE_RATE);
        assert_eq!(t, 8.0 * 88.0 / 10e9);
    }

    #[test]
    fn cycle_conversions_round_trip() {
        let clock = constants::CLOCK_FREQ_SFP;
        let secs = cycles_to_secs(156_250_000, clock);
        assert!((secs - 1.0).abs() < 1e-12);
        assert_eq!(secs_to_cycles(secs, clock).round() as u64, 156_250_000);
    }
}
