//! Binary trace buffer format.
//!
//! Each packet is a fixed 8 byte metadata word followed by its payload
//! prefix. The metadata word packs, little-endian: the inter-packet gap in
//! clock cycles (bits 0..32), the snap length (bits 32..48) and the wire
//! length (bits 48..64). The whole buffer is padded to a 64 byte alignment
//! boundary with all-ones words before it is transferred to device memory.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use tengig_common::constants::{TRACE_ALIGN, TRACE_PAD};

use crate::payload;
use crate::record::{self, PacketRecord};

/// Length of the packed metadata word preceding each payload.
pub const META_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("invalid record: {0}")]
    Record(#[from] record::Error),
}

/// Packed per-packet metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Meta {
    gap_cycles: u32,
    snap_len: u16,
    wire_len: u16,
}

impl Meta {
    fn pack(&self) -> u64 {
        u64::from(self.gap_cycles)
            | u64::from(self.snap_len) << 32
            | u64::from(self.wire_len) << 48
    }

    fn unpack(word: u64) -> Self {
        Self {
            gap_cycles: word as u32,
            snap_len: (word >> 32) as u16,
            wire_len: (word >> 48) as u16,
        }
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Meta,
    Payload(Meta),
    Padding,
}

/// Codec for the hardware trace record format.
#[derive(Debug, Default)]
pub struct Codec {
    /// The current state of the decoder.
    state: State,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for Codec {
    type Item = PacketRecord;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Meta => {
                    if src.len() < META_LEN {
                        // A short all-ones tail is alignment padding.
                        if !src.is_empty() && src.iter().all(|&b| b == 0xFF) {
                            src.advance(src.len());
                        }
                        return Ok(None);
                    }

                    // Peek the metadata word without advancing the cursor; an
                    // all-ones word marks the start of the alignment padding.
                    let word = u64::from_le_bytes(src[..META_LEN].try_into().expect("8 bytes"));
                    if word == TRACE_PAD {
                        self.state = State::Padding;
                        continue;
                    }

                    src.advance(META_LEN);
                    self.state = State::Payload(Meta::unpack(word));
                }
                State::Payload(meta) => {
                    if src.len() < usize::from(meta.snap_len) {
                        return Ok(None);
                    }

                    let payload = src.split_to(usize::from(meta.snap_len)).freeze();
                    let calibration = payload::is_calibration(&payload);
                    let record =
                        PacketRecord::new(meta.gap_cycles, meta.wire_len, payload, calibration)?;

                    self.state = State::Meta;
                    return Ok(Some(record));
                }
                State::Padding => {
                    src.advance(src.len());
                    return Ok(None);
                }
            }
        }
    }
}

impl Encoder<PacketRecord> for Codec {
    type Error = Error;

    fn encode(&mut self, item: PacketRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let meta = Meta {
            gap_cycles: item.gap_cycles(),
            snap_len: item.snap_len(),
            wire_len: item.wire_len(),
        };

        dst.reserve(META_LEN + usize::from(meta.snap_len));
        dst.put_u64_le(meta.pack());
        dst.put(item.into_payload());

        Ok(())
    }
}

/// Pads `buf` to the 64 byte DMA alignment with the all-ones sentinel.
pub fn pad_to_alignment(buf: &mut BytesMut) {
    while buf.len() % TRACE_ALIGN != 0 {
        buf.put_u8(0xFF);
    }
}

/// Decodes all records of an encoded (and possibly padded) trace buffer.
pub fn decode_trace(buf: &Bytes) -> Result<Vec<PacketRecord>, Error> {
    let mut src = BytesMut::from(&buf[..]);
    let mut codec = Codec::new();
    let mut records = Vec::new();

    while let Some(record) = codec.decode(&mut src)? {
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(gap: u32, wire: u16, snap: usize) -> PacketRecord {
        PacketRecord::new(gap, wire, Bytes::from(vec![0xAB; snap]), false).unwrap()
    }

    #[test]
    fn meta_packs_fields_at_defined_offsets() {
        let meta = Meta { gap_cycles: 0x1234_5678, snap_len: 0x00AB, wire_len: 0x05EE };
        let word = meta.pack();
        assert_eq!(word & 0xFFFF_FFFF, 0x1234_5678);
        assert_eq!((word >> 32) & 0xFFFF, 0x00AB);
        assert_eq!(word >> 48, 0x05EE);
        assert_eq!(Meta::unpack(word), meta);
    }

    #[test]
    fn round_trip_preserves_records() {
        let records = vec![record(100, 64, 16), record(u32::MAX, 1518, 34), record(7, 256, 0)];

        let mut buf = BytesMut::new();
        let mut codec = Codec::new();
        for r in records.clone() {
            codec.encode(r, &mut buf).unwrap();
        }
        pad_to_alignment(&mut buf);

        assert_eq!(buf.len() % TRACE_ALIGN, 0);

        let decoded = decode_trace(&buf.freeze()).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn decoder_stops_at_padding() {
        let mut buf = BytesMut::new();
        let mut codec = Codec::new();
        codec.encode(record(42, 64, 8), &mut buf).unwrap();
        pad_to_alignment(&mut buf);

        let mut src = BytesMut::from(&buf.freeze()[..]);
        let mut codec = Codec::new();
        assert!(codec.decode(&mut src).unwrap().is_some());
        assert!(codec.decode(&mut src).unwrap().is_none());
        // The padding has been consumed entirely.
        assert!(src.is_empty());
    }

    #[test]
    fn partial_meta_is_not_a_record() {
        let mut src = BytesMut::from(&[0x01u8, 0x02, 0x03][..]);
        let mut codec = Codec::new();
        assert!(codec.decode(&mut src).unwrap().is_none());
        // Not padding, so the bytes stay buffered.
        assert_eq!(src.len(), 3);
    }
}
