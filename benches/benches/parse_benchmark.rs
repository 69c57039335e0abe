//! Timestamp and file decoding benchmarks.
//!
//! Run with: `cargo bench --package fxmaster-bench --bench parse_benchmark`

use chrono::NaiveDateTime;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fxmaster_bench::{synthetic_gz, synthetic_timestamps};
use fxmaster_ingest::{parse_timestamp, read_source};
use std::hint::black_box;
use tempfile::TempDir;

const FORMAT: &str = "%m/%d/%Y %H:%M:%S%.3f";

fn timestamp_benchmark(c: &mut Criterion) {
    let timestamps = synthetic_timestamps(10_000);

    let mut group = c.benchmark_group("timestamp");
    group.throughput(Throughput::Elements(timestamps.len() as u64));

    group.bench_function("fixed_offset", |b| {
        b.iter(|| {
            for ts in &timestamps {
                black_box(parse_timestamp(black_box(ts)).ok());
            }
        });
    });

    group.bench_function("chrono_format", |b| {
        b.iter(|| {
            for ts in &timestamps {
                black_box(NaiveDateTime::parse_from_str(black_box(ts), FORMAT).ok());
            }
        });
    });

    group.finish();
}

fn decode_benchmark(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("create temp dir");

    let mut group = c.benchmark_group("decode");
    group.sample_size(20);

    for rows in [10_000usize, 100_000] {
        let path = temp_dir.path().join(format!("EURUSD_2016_{}.csv.gz", rows / 10_000));
        std::fs::write(&path, synthetic_gz(rows).expect("encode fixture")).expect("write fixture");

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("gunzip", rows), &path, |b, path| {
            b.iter(|| black_box(read_source(path).expect("read fixture").len()));
        });
    }

    group.finish();
}

criterion_group!(benches, timestamp_benchmark, decode_benchmark);
criterion_main!(benches);
