//! Latency and inter-arrival statistics for the accuracy sweeps.

use rustc_hash::FxHashMap;

/// One row of a latency histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramRow {
    /// Bin center in nanoseconds.
    pub latency_ns: f64,
    pub occurrences: u64,
}

/// Arithmetic mean. `None` for an empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation around `mean`. `None` for an empty input.
pub fn std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let var =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Smallest and largest value. `None` for an empty input.
pub fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
}

/// Bins latencies (in seconds) at nanosecond resolution, the granularity of
/// the hardware timestamps, and returns the occupied bins in ascending
/// order.
pub fn latency_histogram(latencies: &[f64]) -> Vec<HistogramRow> {
    let mut bins: FxHashMap<u64, u64> = FxHashMap::default();
    for &latency in latencies {
        *bins.entry((latency * 1e9).round() as u64).or_insert(0) += 1;
    }

    let mut rows: Vec<HistogramRow> = bins
        .into_iter()
        .map(|(ns, occurrences)| HistogramRow { latency_ns: ns as f64, occurrences })
        .collect();
    rows.sort_by(|a, b| a.latency_ns.total_cmp(&b.latency_ns));
    rows
}

/// Drops the leading inter-arrival delta: the first captured packet has no
/// meaningful predecessor, its delta is measurement noise.
pub fn trim_first(deltas: &[f64]) -> &[f64] {
    if deltas.is_empty() {
        deltas
    } else {
        &deltas[1..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std_dev() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let m = mean(&values).unwrap();
        assert_eq!(m, 2.5);
        let sd = std_dev(&values, m).unwrap();
        assert!((sd - 1.118_033_988_749_895).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_have_no_statistics() {
        assert!(mean(&[]).is_none());
        assert!(std_dev(&[], 0.0).is_none());
        assert!(bounds(&[]).is_none());
    }

    #[test]
    fn histogram_bins_at_nanosecond_resolution() {
        // 1000 ns, 1000 ns (rounded from 1000.4), 1001 ns.
        let latencies = [1.0e-6, 1.0004e-6, 1.0008e-6];
        let rows = latency_histogram(&latencies);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].latency_ns, 1000.0);
        assert_eq!(rows[0].occurrences, 2);
        assert_eq!(rows[1].latency_ns, 1001.0);
        assert_eq!(rows[1].occurrences, 1);

        let total: u64 = rows.iter().map(|r| r.occurrences).sum();
        assert_eq!(total, latencies.len() as u64);
    }

    #[test]
    fn bounds_find_extremes() {
        let (min, max) = bounds(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(min, 1.0);
        assert_eq!(max, 3.0);
    }

    #[test]
    fn first_delta_is_discarded() {
        let deltas = [9.9, 1.0, 2.0];
        assert_eq!(trim_first(&deltas), &[1.0, 2.0]);
        assert!(trim_first(&[]).is_empty());
    }
}
