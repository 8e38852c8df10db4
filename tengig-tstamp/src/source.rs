//! Polling driver for timestamp sources.
//!
//! The capture hardware is polled as fast as possible on a single thread;
//! the loop never blocks waiting for a burst to complete. A missing fourth
//! packet surfaces as [`Error::BurstInterrupted`] the moment a plain packet
//! arrives, not as a timeout.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::pairing::{BurstPairing, Error, RxEvent};

/// A source of received-packet observations, e.g. the RX ring of a capture
/// NIC.
pub trait TimestampSource {
    /// Drains the packets received since the last poll into `events`.
    /// `events` is cleared first; leaving it empty means nothing arrived.
    fn poll(&mut self, events: &mut Vec<RxEvent>);
}

/// Counters kept by the polling loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Total packets seen.
    pub packets: u64,
    /// Timestamped packets seen.
    pub timestamped: u64,
    /// Completed bursts.
    pub bursts: u64,
}

/// Polls `source` until `stop` is raised, pairing bursts and handing every
/// resolved delta triple to `on_deltas`.
///
/// Runs on the calling thread. Returns the loop counters on a clean stop
/// and the pairing error on a cut burst.
pub fn run<S, F>(
    source: &mut S,
    stop: &AtomicBool,
    mut on_deltas: F,
) -> Result<PollStats, Error>
where
    S: TimestampSource,
    F: FnMut(&[u64; 3]),
{
    let mut pairing = BurstPairing::new();
    let mut stats = PollStats::default();
    let mut events = Vec::new();

    while !stop.load(Ordering::Relaxed) {
        source.poll(&mut events);
        if events.is_empty() {
            continue;
        }

        stats.packets += events.len() as u64;
        for &event in &events {
            if matches!(event, RxEvent::Timestamped(_)) {
                stats.timestamped += 1;
            }
            if let Some(deltas) = pairing.feed(event)? {
                stats.bursts += 1;
                on_deltas(&deltas);
            }
        }
    }

    debug!(
        packets = stats.packets,
        timestamped = stats.timestamped,
        bursts = stats.bursts,
        "polling loop stopped"
    );
    Ok(stats)
}
