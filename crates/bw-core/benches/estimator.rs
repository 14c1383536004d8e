use std::hint::black_box;

use bw_core::{
    BreathingEstimator, BreathingMetrics, Sample, TherapeuticFrequencySelector, entrain,
};
use criterion::{Criterion, criterion_group, criterion_main};

fn sine_samples(count: u64, step_ms: u64) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let t = i * step_ms;
            let level = 0.5 + 0.4 * (std::f64::consts::TAU * t as f64 / 4_000.0).sin();
            Sample::new(level, t)
        })
        .collect()
}

fn bench_ingest(c: &mut Criterion) {
    // 20 ms cadence keeps a full 15 s window of 750 samples
    let warm = sine_samples(1_000, 20);
    let mut group = c.benchmark_group("ingest");
    group.bench_function("full_window_tick", |b| {
        let mut est = BreathingEstimator::default();
        for s in &warm {
            est.ingest(*s);
        }
        let mut t: u64 = 1_000 * 20;
        b.iter(|| {
            let level = 0.5 + 0.4 * (std::f64::consts::TAU * t as f64 / 4_000.0).sin();
            let outcome = est.ingest(Sample::new(level, t));
            t += 20;
            black_box(outcome)
        });
    });
    group.bench_function("cold_60s_stream", |b| {
        let stream = sine_samples(3_000, 20);
        b.iter(|| {
            let mut est = BreathingEstimator::default();
            for s in &stream {
                est.ingest(*s);
            }
            black_box(est.current_metrics())
        });
    });
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let selector = TherapeuticFrequencySelector::default();
    let metrics = BreathingMetrics {
        rate: 14.0,
        depth: 0.45,
        regularity: 0.8,
        coherence: 0.7,
        stress_level: 0.35,
    };
    let cycles = [4_200.0, 4_350.0, 4_100.0];
    c.bench_function("select_with_cycles", |b| {
        b.iter(|| selector.select_with_cycles(black_box(&metrics), 0.8, black_box(&cycles)))
    });
    c.bench_function("entrain", |b| {
        b.iter(|| entrain(black_box(528), black_box(&cycles), 3, 0.05))
    });
}

criterion_group!(benches, bench_ingest, bench_select);
criterion_main!(benches);
