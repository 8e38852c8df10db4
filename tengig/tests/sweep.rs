//! End-to-end sweeps against the software tester model.

use std::time::Duration;

use tengig::sim::SimTester;
use tengig::{
    report, stats, CaptureOptions, NetworkTester, NullObserver, SizePolicy, SynthOptions,
    Synthesizer, TesterConfig, ThroughputSweep, ThroughputSweepOptions,
};

fn sweep_options(lengths: Vec<u16>) -> ThroughputSweepOptions {
    ThroughputSweepOptions::default()
        .packet_lengths(lengths)
        .duration(Duration::from_millis(1))
}

#[tokio::test]
async fn throughput_sweep_discovers_the_device_limit() {
    let _ = tracing_subscriber::fmt::try_init();

    let limit = 9.2e9;
    let mut tester = SimTester::new(4, limit);
    let sweep = ThroughputSweep::new(sweep_options(vec![64, 256]));

    let rows = sweep.run(&mut tester, &NullObserver).await.unwrap();
    assert_eq!(rows.len(), 2);

    for row in &rows {
        let per_interface = row.max_datarate / 4.0;
        assert!(per_interface <= limit, "len {}: {per_interface}", row.packet_len);
        assert!(limit - per_interface <= 2.0 * 0.01e9);
        // Memory bandwidth scales with 2x concurrent replay/capture and
        // 2x DRAM read+write on top of the four interfaces.
        assert!(row.required_membw > row.max_datarate);
    }

    // Result rows serialize to three whitespace-separated columns.
    let mut out = Vec::new();
    report::write_throughput_to(&mut out, &rows).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 2);
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields.len(), 3);
        fields[0].parse::<u16>().unwrap();
        assert!(fields[1].parse::<f64>().unwrap() > 0.0);
        assert!(fields[2].parse::<f64>().unwrap() > 0.0);
    }
}

#[tokio::test]
async fn latency_statistics_from_a_captured_run() {
    let latency = 1.2e-6;
    let mut tester = SimTester::new(1, 10e9).latency(latency);

    let synth = Synthesizer::new(SynthOptions::default().seed(11));
    let trace = synth
        .synthesize(1e9, SizePolicy::Fixed(256), Duration::from_millis(2))
        .unwrap();
    let packets = trace.packet_count();

    let config = TesterConfig::new(1)
        .trace(0, trace.into())
        .capture(CaptureOptions::default().enable(true).max_len(0));

    tester.write_config(config).await.unwrap();
    tester.start_capture().await.unwrap();
    tester.start_replay().await.unwrap();
    tester.stop_capture().await.unwrap();

    assert!(tester.check_error().is_none());
    let capture = tester.take_capture(0).expect("capture data");
    assert_eq!(capture.len(), packets);

    let latencies = capture.latencies();
    let mean = stats::mean(&latencies).unwrap();
    assert!((mean - latency).abs() < 1e-12);
    let histogram = stats::latency_histogram(&latencies);
    assert_eq!(histogram.iter().map(|r| r.occurrences).sum::<u64>(), packets as u64);

    // Constant bit rate: all trimmed arrival deltas within a cycle of each
    // other.
    let deltas = capture.arrival_deltas();
    let deltas = stats::trim_first(&deltas);
    let (min, max) = stats::bounds(deltas).unwrap();
    assert!(max - min < 2.0 / tengig::constants::CLOCK_FREQ_SFP);

    tester.free_host_memory();
    assert!(tester.take_capture(0).is_none());
}
