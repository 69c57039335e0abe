//! Bar aggregation throughput.
//!
//! Run with: `cargo bench --package fxmaster-bench --bench aggregate_benchmark`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fxmaster_bench::synthetic_ticks;
use fxmaster_lib::{Frequency, SeriesKey};
use fxmaster_resample::aggregate;
use std::hint::black_box;

fn aggregate_benchmark(c: &mut Criterion) {
    // One trading day at four ticks per second.
    let ticks = synthetic_ticks(345_600);
    let series = SeriesKey::new("EURUSD", "fxcm");

    let mut group = c.benchmark_group("aggregate");
    group.throughput(Throughput::Elements(ticks.len() as u64));
    group.sample_size(20);

    for frequency in [Frequency::Minute1, Frequency::Hour1, Frequency::Day1] {
        group.bench_with_input(
            BenchmarkId::from_parameter(frequency.as_str()),
            &frequency,
            |b, &frequency| {
                b.iter(|| black_box(aggregate(&ticks, &series, frequency).len()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, aggregate_benchmark);
criterion_main!(benches);
