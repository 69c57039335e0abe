//! Display utilities and argument parsing for the fxmaster CLI.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use fxmaster_lib::prelude::*;
use fxmaster_lib::{MarketEvent, ResampleReport};
use indicatif::{ProgressBar, ProgressStyle};

/// Output format for replayed events.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Text,
    Ndjson,
}

/// Parses `YYYY-MM-DD` (midnight UTC) or an RFC 3339 instant.
pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid time: {s} (expected YYYY-MM-DD or RFC 3339)"))
}

/// Builds a window from optional bounds. Both or neither must be given.
pub(crate) fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<Option<TimeWindow>> {
    match (start, end) {
        (Some(start), Some(end)) => {
            let window = TimeWindow::new(parse_time(start)?, parse_time(end)?)?;
            Ok(Some(window))
        }
        (None, None) => Ok(None),
        _ => bail!("--start and --end must be given together"),
    }
}

/// Progress bar counting buckets, hidden in quiet mode.
pub(crate) fn bucket_progress(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} buckets ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Formats a replayed event as one output line.
pub(crate) fn event_line(event: &MarketEvent, format: Format) -> Result<String> {
    match format {
        Format::Text => {
            let MarketEvent::Tick(tick) = event;
            Ok(format!(
                "{} {} {:.5} {:.5} {}",
                tick.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                tick.symbol,
                tick.bid,
                tick.ask,
                tick.provider
            ))
        }
        Format::Ndjson => Ok(serde_json::to_string(event)?),
    }
}

/// Prints a one-line summary of a resampled series.
pub(crate) fn print_resample_report(report: &ResampleReport) {
    let window = report
        .window
        .map_or_else(|| "no ticks".to_string(), |w| w.to_string());
    println!(
        "{:<16} {:<6} {:<8} {:>8} bars {:>5} chunks ({} empty)  {}{}",
        report.series.to_string(),
        report.frequency.as_str(),
        report.mode.to_string(),
        report.bars_written,
        report.chunks,
        report.empty_chunks,
        window,
        if report.cancelled { "  [cancelled]" } else { "" }
    );
}

/// Formats an optional instant, or `-`.
pub(crate) fn format_time(instant: Option<DateTime<Utc>>) -> String {
    instant.map_or_else(
        || "-".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
