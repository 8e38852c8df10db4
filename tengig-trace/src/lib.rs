//! Packet trace model, synthesis and binary encoding for the tester
//! hardware.
//!
//! A [`Trace`] is an ordered, timed sequence of packets that the hardware
//! generator replays back to back. Traces are built by the [`Synthesizer`],
//! which spaces packets with cycle-quantized inter-packet gaps so that the
//! replayed stream hits a target mean data rate, and optionally interleaves
//! four-packet timestamp calibration bursts (see [`calibration`]).
//!
//! The binary record format understood by the hardware lives in [`wire`].

pub mod calibration;
pub mod record;
pub mod synth;
pub mod wire;

mod payload;
mod trace;

pub use calibration::{BurstInserter, BurstSlot};
pub use payload::PayloadTemplate;
pub use record::PacketRecord;
pub use synth::{SizePolicy, SynthOptions, Synthesizer};
pub use trace::Trace;
