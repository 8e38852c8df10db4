use bytes::Bytes;
use pnet::packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet::util::MacAddr;

/// EtherType of IEEE 1588 frames; calibration packets carry it so that
/// capture hardware timestamps them.
pub(crate) const ETHERTYPE_PTP: u16 = 0x88F7;

/// PTP version written into the header of calibration packets.
const PTP_VERSION: u8 = 2;

/// Byte offset of the EtherType field within the Ethernet header.
const ETHERTYPE_OFFSET: usize = 12;

/// Byte offset of the PTP version field as transferred to the hardware.
const PTP_VERSION_OFFSET: usize = 15;

/// Minimum snap length for marking calibration packets: the Ethernet header
/// plus the PTP header bytes the hardware matches on.
pub(crate) const CALIBRATION_MIN_SNAP: u16 = 16;

/// Returns whether an encoded payload prefix carries the IEEE 1588
/// EtherType, i.e. belongs to a calibration burst.
pub(crate) fn is_calibration(payload: &[u8]) -> bool {
    payload.len() > ETHERTYPE_OFFSET + 1
        && payload[ETHERTYPE_OFFSET..ETHERTYPE_OFFSET + 2] == ETHERTYPE_PTP.to_be_bytes()
}

/// The payload prefixes transferred to the hardware for every synthesized
/// packet.
///
/// All packets of a trace share the same Ethernet header; only the EtherType
/// distinguishes ordinary traffic (IPv4) from calibration packets
/// (IEEE 1588). The hardware zero-pads each frame up to its wire length, so
/// only the prefix is kept in host memory.
#[derive(Debug, Clone)]
pub struct PayloadTemplate {
    ordinary: Bytes,
    calibration: Bytes,
}

impl PayloadTemplate {
    /// Builds payload templates of `snap_len` bytes with an Ethernet header
    /// for the given addresses.
    ///
    /// Snap lengths shorter than an Ethernet header produce unstructured
    /// zero payloads; such traces cannot carry calibration bursts.
    pub fn ethernet(src: MacAddr, dst: MacAddr, snap_len: u16) -> Self {
        let len = usize::from(snap_len);
        if len < ETHERTYPE_OFFSET + 2 {
            let zeros = Bytes::from(vec![0u8; len]);
            return Self { ordinary: zeros.clone(), calibration: zeros };
        }

        let mut buf = vec![0u8; len.max(14)];
        {
            let mut eth =
                MutableEthernetPacket::new(&mut buf).expect("buffer holds an ethernet header");
            eth.set_source(src);
            eth.set_destination(dst);
            eth.set_ethertype(EtherTypes::Ipv4);
        }
        buf.truncate(len);
        let ordinary = Bytes::from(buf.clone());

        buf[ETHERTYPE_OFFSET..ETHERTYPE_OFFSET + 2].copy_from_slice(&ETHERTYPE_PTP.to_be_bytes());
        if buf.len() > PTP_VERSION_OFFSET {
            buf[PTP_VERSION_OFFSET] = PTP_VERSION;
        }
        let calibration = Bytes::from(buf);

        Self { ordinary, calibration }
    }

    /// Payload prefix of an ordinary packet. `Bytes` clones are cheap, the
    /// backing storage is shared across all packets of a trace.
    pub fn ordinary(&self) -> Bytes {
        self.ordinary.clone()
    }

    /// Payload prefix of a calibration packet.
    pub fn calibration(&self) -> Bytes {
        self.calibration.clone()
    }

    pub fn snap_len(&self) -> u16 {
        self.ordinary.len() as u16
    }
}
