//! Result files.
//!
//! Whitespace-separated text rows, one file per sweep. Failing to create an
//! output file is a configuration error and fatal to the caller.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::stats::HistogramRow;
use crate::throughput::SweepRow;

/// Writes `<packet_length> <max_datarate_bps> <required_membw_bps>` rows.
pub fn write_throughput(path: impl AsRef<Path>, rows: &[SweepRow]) -> io::Result<()> {
    let path = path.as_ref();
    info!(path = %path.display(), rows = rows.len(), "writing throughput results");
    let mut w = BufWriter::new(File::create(path)?);
    write_throughput_to(&mut w, rows)?;
    w.flush()
}

pub fn write_throughput_to(mut w: impl Write, rows: &[SweepRow]) -> io::Result<()> {
    for row in rows {
        writeln!(w, "{} {:.6} {:.6}", row.packet_len, row.max_datarate, row.required_membw)?;
    }
    Ok(())
}

/// Writes `<latency_ns> <occurrence_count>` histogram rows.
pub fn write_histogram(path: impl AsRef<Path>, rows: &[HistogramRow]) -> io::Result<()> {
    let path = path.as_ref();
    info!(path = %path.display(), rows = rows.len(), "writing latency histogram");
    let mut w = BufWriter::new(File::create(path)?);
    write_histogram_to(&mut w, rows)?;
    w.flush()
}

pub fn write_histogram_to(mut w: impl Write, rows: &[HistogramRow]) -> io::Result<()> {
    for row in rows {
        writeln!(w, "{:.6} {}", row.latency_ns, row.occurrences)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_rows_are_whitespace_separated() {
        let rows = [
            SweepRow { packet_len: 64, max_datarate: 36.75e9, required_membw: 147.0e9 },
            SweepRow { packet_len: 1518, max_datarate: 40.0e9, required_membw: 160.0e9 },
        ];

        let mut out = Vec::new();
        write_throughput_to(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "64 36750000000.000000 147000000000.000000");
        assert_eq!(lines[1].split_whitespace().count(), 3);
    }

    #[test]
    fn histogram_rows_carry_counts() {
        let rows = [
            HistogramRow { latency_ns: 1000.0, occurrences: 2 },
            HistogramRow { latency_ns: 1001.0, occurrences: 1 },
        ];

        let mut out = Vec::new();
        write_histogram_to(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "1000.000000 2\n1001.000000 1\n");
    }
}
