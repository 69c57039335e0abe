//! Benchmark runner that outputs a markdown table for the README.
//!
//! Run with: `cargo run --package fxmaster-bench --bin benchmark_table --release`

use chrono::NaiveDateTime;
use fxmaster_bench::{BenchmarkResult, format_duration, synthetic_ticks, synthetic_timestamps};
use fxmaster_ingest::parse_timestamp;
use fxmaster_lib::{Frequency, SeriesKey};
use fxmaster_resample::aggregate;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Number of iterations per benchmark.
const ITERATIONS: u32 = 5;

/// Rows per run.
const ROWS: usize = 1_000_000;

fn timed<F: FnMut() -> u64>(name: &str, mut run: F) -> BenchmarkResult {
    let mut total = Duration::ZERO;
    let mut items = 0;
    for _ in 0..ITERATIONS {
        let started = Instant::now();
        items = black_box(run());
        total += started.elapsed();
    }
    BenchmarkResult {
        name: name.to_string(),
        duration: total / ITERATIONS,
        items,
    }
}

fn main() {
    println!("fxmaster Benchmark");
    println!("==================\n");
    println!("Running benchmarks ({ITERATIONS} iterations each, {ROWS} rows)...\n");

    let timestamps = synthetic_timestamps(ROWS);
    let ticks = synthetic_ticks(ROWS);
    let series = SeriesKey::new("EURUSD", "fxcm");

    let results = [
        timed("parse_timestamp (fixed offset)", || {
            timestamps
                .iter()
                .filter(|ts| parse_timestamp(ts).is_ok())
                .count() as u64
        }),
        timed("chrono parse_from_str", || {
            timestamps
                .iter()
                .filter(|ts| NaiveDateTime::parse_from_str(ts, "%m/%d/%Y %H:%M:%S%.3f").is_ok())
                .count() as u64
        }),
        timed("aggregate 1min", || {
            aggregate(&ticks, &series, Frequency::Minute1).len() as u64
        }),
        timed("aggregate 1h", || {
            aggregate(&ticks, &series, Frequency::Hour1).len() as u64
        }),
    ];

    println!("| Benchmark | Time | Items | Throughput |");
    println!("|-----------|------|-------|------------|");
    for result in &results {
        println!(
            "| {} | {} | {} | {:.1}M/s |",
            result.name,
            format_duration(result.duration),
            result.items,
            result.items_per_sec() / 1_000_000.0
        );
    }

    println!("\n### Environment\n");
    println!("- OS: {}", std::env::consts::OS);
    println!("- Arch: {}", std::env::consts::ARCH);
}
