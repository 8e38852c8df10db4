//! Calibration burst pairing for hardware RX timestamps.
//!
//! The traffic generator emits calibration packets in contiguous bursts of
//! four; the capture NIC stores an RX timestamp for each of them in one of
//! its four timestamp registers, which only unlock when read. This crate
//! pairs the resulting timestamp stream back into bursts ([`BurstPairing`]),
//! derives the three inter-arrival deltas per burst and collects them for
//! comparison against the spacings recorded at synthesis time
//! ([`DeltaSink`]). A tight polling driver for register sources lives in
//! [`source`].

pub mod pairing;
pub mod sink;
pub mod source;

pub use pairing::{BurstPairing, Error, RxEvent, State};
pub use sink::DeltaSink;
pub use source::{PollStats, TimestampSource};
