//! Benchmark utilities for fxmaster.
//!
//! Synthetic weekly files and tick series shaped like real FXCM data:
//! one quote per 250 ms, mid prices drifting in a narrow band.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use fxmaster_lib::TickRecord;
use std::io::Write;
use std::time::Duration;

/// Interval between synthetic ticks.
pub const TICK_INTERVAL_MS: i64 = 250;

/// Result of a timed run.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// What was measured.
    pub name: String,
    /// Wall time of the run.
    pub duration: Duration,
    /// Items processed.
    pub items: u64,
}

impl BenchmarkResult {
    /// Items processed per second.
    pub fn items_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 { self.items as f64 / secs } else { 0.0 }
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 2, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn bid(i: usize) -> f64 {
    1.1 + ((i % 400) as f64 - 200.0) * 0.00001
}

/// Returns `n` source timestamps in `MM/DD/YYYY HH:MM:SS.mmm` form.
pub fn synthetic_timestamps(n: usize) -> Vec<String> {
    let start = start();
    (0..n)
        .map(|i| {
            (start + TimeDelta::milliseconds(i as i64 * TICK_INTERVAL_MS))
                .format("%m/%d/%Y %H:%M:%S%.3f")
                .to_string()
        })
        .collect()
}

/// Returns the text of a source file with `n` data rows.
pub fn synthetic_csv(n: usize) -> String {
    let mut csv = String::from("DateTime,Bid,Ask\n");
    for (i, ts) in synthetic_timestamps(n).iter().enumerate() {
        let bid = bid(i);
        csv.push_str(&format!("{ts},{bid:.5},{:.5}\n", bid + 0.0002));
    }
    csv
}

/// Returns a gzip-compressed source file with `n` data rows.
pub fn synthetic_gz(n: usize) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(synthetic_csv(n).as_bytes())?;
    encoder.finish()
}

/// Returns `n` time-ordered ticks of one series.
pub fn synthetic_ticks(n: usize) -> Vec<TickRecord> {
    let start = start();
    (0..n)
        .map(|i| {
            let bid = bid(i);
            TickRecord::new(
                start + TimeDelta::milliseconds(i as i64 * TICK_INTERVAL_MS),
                "EURUSD",
                "fxcm",
                bid,
                bid + 0.0002,
            )
        })
        .collect()
}

/// Format duration for display.
pub fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{micros}µs")
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
