use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tengig::{SizePolicy, SynthOptions, Synthesizer};

const DURATION: Duration = Duration::from_millis(5);
const RATE: f64 = 8e9;

fn bench_synthesize_cbr(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize_cbr");
    let synth = Synthesizer::new(SynthOptions::default().seed(1));

    for &len in &[64u16, 256, 1518] {
        let packets = Synthesizer::packet_count(RATE, SizePolicy::Fixed(len), DURATION);
        group.throughput(Throughput::Elements(packets as u64));
        group.bench_function(BenchmarkId::from_parameter(len), |b| {
            b.iter(|| synth.synthesize(RATE, SizePolicy::Fixed(len), DURATION).unwrap())
        });
    }
    group.finish();
}

fn bench_synthesize_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize_random");
    let synth = Synthesizer::new(
        SynthOptions::default().seed(1).snap_len(16).calibration_interval(Duration::from_micros(75)),
    );

    let sizes = SizePolicy::Uniform { min: 60, max: 1514 };
    let packets = Synthesizer::packet_count(RATE, sizes, DURATION);
    group.throughput(Throughput::Elements(packets as u64));
    group.bench_function("with_calibration", |b| {
        b.iter(|| synth.synthesize(RATE, sizes, DURATION).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_synthesize_cbr, bench_synthesize_random);
criterion_main!(benches);
