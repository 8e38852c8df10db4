//! Collected burst deltas and their output format.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

/// Accumulates the inter-arrival deltas of resolved calibration bursts.
///
/// The output format is one raw nanosecond value per line, ready for
/// comparison against the expected intervals recorded at synthesis time.
#[derive(Debug, Default)]
pub struct DeltaSink {
    deltas: Vec<u64>,
}

impl DeltaSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the three deltas of one resolved burst.
    pub fn push_burst(&mut self, deltas: &[u64; 3]) {
        self.deltas.extend_from_slice(deltas);
    }

    pub fn deltas(&self) -> &[u64] {
        &self.deltas
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Writes one nanosecond value per line.
    pub fn write_to(&self, mut w: impl Write) -> io::Result<()> {
        for delta in &self.deltas {
            writeln!(w, "{delta}")?;
        }
        Ok(())
    }

    /// Writes the collected deltas to `path`.
    pub fn write_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), deltas = self.deltas.len(), "writing timestamp deltas");
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_value_per_line() {
        let mut sink = DeltaSink::new();
        sink.push_burst(&[480, 1920, 960]);
        sink.push_burst(&[320, 320, 320]);
        assert_eq!(sink.len(), 6);

        let mut out = Vec::new();
        sink.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "480\n1920\n960\n320\n320\n320\n");
    }

    #[test]
    fn empty_sink_writes_nothing() {
        let sink = DeltaSink::new();
        let mut out = Vec::new();
        sink.write_to(&mut out).unwrap();
        assert!(out.is_empty());
        assert!(sink.is_empty());
    }
}
