#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Host-side control software for an FPGA-based 10GbE traffic generator and
//! capture tester.
//!
//! The crates compose as follows: [`tengig_trace`] synthesizes
//! cycle-accurate packet traces, [`tengig_hw`] is the seam to the tester
//! hardware (with a deterministic software model for development),
//! [`tengig_sweep`] drives the measurement sweeps over that seam, and
//! [`tstamp`] is the auxiliary tool pairing hardware RX timestamps into
//! calibration burst deltas.

pub use tengig_common::constants;
pub use tengig_hw::*;
pub use tengig_sweep::*;
pub use tengig_trace::*;
pub use tengig_tstamp as tstamp;
