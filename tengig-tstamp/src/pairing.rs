//! The burst pairing state machine.

use thiserror::Error;

/// One received packet as reported by the capture hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// The hardware stored an RX timestamp for this packet, in nanoseconds.
    Timestamped(u64),
    /// An ordinary packet without a timestamp.
    Plain,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A plain packet arrived while a burst was being accumulated. The
    /// generator always emits exactly four contiguous timestamped packets
    /// per burst and the timestamp registers only unlock on read, so a cut
    /// burst signals a wiring or configuration defect, never a transient
    /// condition.
    #[error("calibration burst cut short after {got} of 4 timestamped packets")]
    BurstInterrupted { got: u8 },
}

/// Pairing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No timestamped packets buffered.
    Idle,
    /// Between one and three timestamped packets buffered.
    Accumulating,
}

/// Pairs consecutive hardware RX timestamps into bursts of four and derives
/// the three sequential inter-arrival deltas per burst.
///
/// Timestamps must be monotonic within a burst; the hardware guarantees
/// this for packets of one capture session.
#[derive(Debug, Default)]
pub struct BurstPairing {
    buffered: [u64; 4],
    len: u8,
}

impl BurstPairing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        if self.len == 0 {
            State::Idle
        } else {
            State::Accumulating
        }
    }

    /// Feeds one received packet into the state machine.
    ///
    /// Returns the three inter-arrival deltas (nanoseconds) when the packet
    /// completes a burst. A plain packet during an active burst is the fatal
    /// inconsistency described on [`Error::BurstInterrupted`] and is
    /// reported before the packet is processed any further.
    pub fn feed(&mut self, event: RxEvent) -> Result<Option<[u64; 3]>, Error> {
        match event {
            RxEvent::Timestamped(ts) => {
                self.buffered[usize::from(self.len)] = ts;
                self.len += 1;

                if self.len < 4 {
                    return Ok(None);
                }

                let [a, b, c, d] = self.buffered;
                self.len = 0;
                Ok(Some([b - a, c - b, d - c]))
            }
            RxEvent::Plain => {
                if self.len > 0 {
                    return Err(Error::BurstInterrupted { got: self.len });
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_timestamps_emit_three_deltas_and_reset() {
        let mut pairing = BurstPairing::new();

        assert_eq!(pairing.feed(RxEvent::Timestamped(100)), Ok(None));
        assert_eq!(pairing.state(), State::Accumulating);
        assert_eq!(pairing.feed(RxEvent::Timestamped(150)), Ok(None));
        assert_eq!(pairing.feed(RxEvent::Timestamped(175)), Ok(None));

        let deltas = pairing.feed(RxEvent::Timestamped(275)).unwrap().unwrap();
        assert_eq!(deltas, [50, 25, 100]);
        assert_eq!(pairing.state(), State::Idle);

        // The following plain packet is ordinary traffic again.
        assert_eq!(pairing.feed(RxEvent::Plain), Ok(None));
        assert_eq!(pairing.state(), State::Idle);
    }

    #[test]
    fn interrupted_burst_is_fatal() {
        let mut pairing = BurstPairing::new();
        pairing.feed(RxEvent::Timestamped(10)).unwrap();
        pairing.feed(RxEvent::Timestamped(20)).unwrap();

        let err = pairing.feed(RxEvent::Plain).unwrap_err();
        assert_eq!(err, Error::BurstInterrupted { got: 2 });
    }

    #[test]
    fn plain_traffic_passes_through_idle() {
        let mut pairing = BurstPairing::new();
        for _ in 0..100 {
            assert_eq!(pairing.feed(RxEvent::Plain), Ok(None));
        }
        assert_eq!(pairing.state(), State::Idle);
    }

    #[test]
    fn back_to_back_bursts_pair_independently() {
        let mut pairing = BurstPairing::new();
        let mut all = Vec::new();

        for base in [1_000u64, 2_000] {
            for i in 0..4 {
                if let Some(deltas) = pairing.feed(RxEvent::Timestamped(base + i * 10)).unwrap() {
                    all.push(deltas);
                }
            }
        }

        assert_eq!(all, vec![[10, 10, 10], [10, 10, 10]]);
    }
}
