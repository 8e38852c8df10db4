//! Capture data read back from a receiver.

/// Hardware metadata of one captured packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePacket {
    /// Arrival time at the receiver, in seconds since capture start.
    pub arrival: f64,
    /// Replay-to-capture latency in seconds, derived from the timestamp the
    /// generator embedded into the packet.
    pub latency: f64,
    /// Length of the packet on the wire.
    pub wire_len: u16,
}

/// The capture data collected on one interface during a session.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    packets: Vec<CapturePacket>,
}

impl Capture {
    pub fn new(packets: Vec<CapturePacket>) -> Self {
        Self { packets }
    }

    pub fn packets(&self) -> &[CapturePacket] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Latencies of all captured packets, in seconds.
    pub fn latencies(&self) -> Vec<f64> {
        self.packets.iter().map(|p| p.latency).collect()
    }

    /// Inter-packet arrival deltas in seconds. The first packet has no
    /// predecessor, so the result holds one delta less than packets.
    pub fn arrival_deltas(&self) -> Vec<f64> {
        self.packets.windows(2).map(|w| w[1].arrival - w[0].arrival).collect()
    }
}
