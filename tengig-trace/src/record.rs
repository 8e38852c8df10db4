use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("snap length {snap} exceeds wire length {wire}")]
    SnapExceedsWire { snap: usize, wire: u16 },
    #[error("payload of {0} bytes does not fit the 16 bit snap length field")]
    PayloadTooLong(usize),
}

/// One replay entry of a trace: timing, lengths and the payload prefix that
/// is transferred to the hardware.
///
/// The hardware transmits `wire_len` bytes per frame but only the first
/// `snap_len` bytes are sourced from host memory; the remainder is
/// zero-padded by the MAC. On capture, the same `snap_len` prefix is retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRecord {
    /// Spacing between the start of this packet and the start of the next
    /// one, in transmit clock cycles. The 32 bit width of this field is the
    /// hardware limit on inter-packet gaps.
    gap_cycles: u32,
    /// Length of the frame on the wire (FCS not included).
    wire_len: u16,
    /// Marks a timestamp calibration packet.
    calibration: bool,
    /// Payload prefix; its length is the record's snap length.
    payload: Bytes,
}

impl PacketRecord {
    /// Creates a record, validating the length invariants.
    pub fn new(
        gap_cycles: u32,
        wire_len: u16,
        payload: Bytes,
        calibration: bool,
    ) -> Result<Self, Error> {
        let snap = payload.len();
        if snap > usize::from(u16::MAX) {
            return Err(Error::PayloadTooLong(snap));
        }
        if snap > 0 && snap > usize::from(wire_len) {
            return Err(Error::SnapExceedsWire { snap, wire: wire_len });
        }

        Ok(Self { gap_cycles, wire_len, calibration, payload })
    }

    /// Inter-packet spacing in transmit clock cycles.
    pub fn gap_cycles(&self) -> u32 {
        self.gap_cycles
    }

    /// Number of payload bytes transferred to the hardware.
    pub fn snap_len(&self) -> u16 {
        self.payload.len() as u16
    }

    /// Frame length on the wire.
    pub fn wire_len(&self) -> u16 {
        self.wire_len
    }

    /// Whether this packet belongs to a timestamp calibration burst.
    pub fn is_calibration(&self) -> bool {
        self.calibration
    }

    /// The payload prefix transferred to the hardware.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_must_fit_wire() {
        let payload = Bytes::from(vec![0u8; 65]);
        let err = PacketRecord::new(100, 64, payload, false).unwrap_err();
        assert_eq!(err, Error::SnapExceedsWire { snap: 65, wire: 64 });
    }

    #[test]
    fn empty_payload_is_valid_for_any_wire_len() {
        let record = PacketRecord::new(100, 64, Bytes::new(), false).unwrap();
        assert_eq!(record.snap_len(), 0);
        assert_eq!(record.wire_len(), 64);
    }
}
