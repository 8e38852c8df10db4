//! Measurement sweeps over the tester hardware.
//!
//! The centerpiece is the throughput sweep: for every packet length of
//! interest, an adaptive halving-step search ([`Bisection`]) discovers the
//! highest per-interface data rate the device sustains for simultaneous
//! replay and capture before it asserts an overrun register. Latency and
//! inter-arrival statistics for the accuracy sweeps live in [`stats`],
//! result-file writers in [`report`].
//!
//! Progress and inconsistencies are delivered to a caller-supplied
//! [`Observer`]; the sweeps keep no global state.

pub mod bisect;
pub mod events;
pub mod report;
pub mod stats;
pub mod throughput;

pub use bisect::{Bisection, Phase, ProbeOutcome};
pub use events::{NullObserver, Observer, ProbeEvent, TracingObserver};
pub use throughput::{SweepError, SweepRow, ThroughputSweep, ThroughputSweepOptions, Topology};
