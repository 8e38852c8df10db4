//! PCIe DMA throughput benchmark.
//!
//! Measures the sustained host-to-card and card-to-host DMA rates the
//! platform can move, one direction at a time. Each phase loops fixed-size
//! transfers in a worker task until a stop signal fires; the signal is only
//! observed at iteration boundaries, a transfer in flight always completes.
//! Read and write phases never run simultaneously.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// A DMA-capable character device endpoint.
#[async_trait]
pub trait DmaDevice: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads `buf.len()` bytes from the device at `addr`.
    async fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `buf` to the device at `addr`.
    async fn write(&mut self, addr: u64, buf: &[u8]) -> Result<(), Self::Error>;
}

/// Transfer direction of one benchmark phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

#[derive(Debug, Error)]
pub enum DmaError<E: std::error::Error> {
    #[error("device error: {0}")]
    Device(E),
    #[error("benchmark task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Totals recorded by one benchmark phase.
#[derive(Debug, Clone, Copy)]
pub struct DmaReport {
    /// Bytes moved across the link.
    pub bytes: u64,
    /// Time spent inside transfers.
    pub busy: Duration,
}

impl DmaReport {
    /// Achieved throughput in bits per second.
    pub fn throughput_bps(&self) -> f64 {
        8.0 * self.bytes as f64 / self.busy.as_secs_f64()
    }
}

/// Runs fixed-size DMA transfers in one direction for a wall-clock duration.
#[derive(Debug, Clone, Copy)]
pub struct DmaBenchmark {
    transfer_size: usize,
    duration: Duration,
}

impl DmaBenchmark {
    pub fn new(transfer_size: usize, duration: Duration) -> Self {
        Self { transfer_size, duration }
    }

    /// Benchmarks `device` in `direction`, consuming the device for the
    /// duration of the phase.
    pub async fn run<D: DmaDevice>(
        &self,
        mut device: D,
        direction: Direction,
    ) -> Result<DmaReport, DmaError<D::Error>> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let size = self.transfer_size;

        let worker = tokio::spawn(async move {
            let mut data = vec![0u8; size];
            let mut bytes: u64 = 0;
            let mut busy = Duration::ZERO;

            // Stop is checked between transfers only; no mid-transfer
            // cancellation.
            while !*stop_rx.borrow() {
                let started = Instant::now();
                match direction {
                    Direction::Read => device.read(0, &mut data).await?,
                    Direction::Write => device.write(0, &data).await?,
                }
                busy += started.elapsed();
                bytes += size as u64;
            }

            Ok::<_, D::Error>(DmaReport { bytes, busy })
        });

        tokio::time::sleep(self.duration).await;
        // The worker is gone already if the device failed.
        let _ = stop_tx.send(true);

        let report = worker.await?.map_err(DmaError::Device)?;
        debug!(?direction, bytes = report.bytes, "benchmark phase done");
        Ok(report)
    }
}
